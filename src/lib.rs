//! Fetch US COVID-19 case counts and state populations, derive a smoothed
//! per-capita new-case rate per state per day, and draw it as an animated
//! choropleth.

pub mod config;
pub mod export;
pub mod fetch;
pub mod process;
pub mod render;
