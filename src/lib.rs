//! `weather-relay` - current-weather HTTP service with a broker side channel
//!
//! Readings are kept per city in memory. Every accepted write is also encoded
//! and published to a message broker out of band, without the broker being
//! able to affect the HTTP response.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::WeatherRelayConfig;
pub use error::WeatherError;
pub use events::{BrokerClient, Destination, EventCodec, EventPublisher, PublishEvent};
pub use models::WeatherReading;
pub use service::{Accepted, WeatherService};
pub use store::{InMemoryWeatherStore, WeatherStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherError>;
