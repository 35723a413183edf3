pub mod config;
pub mod params;
