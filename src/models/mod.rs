//! Data models for the weather relay

pub mod weather;

pub use weather::{WeatherReading, validate_city};
