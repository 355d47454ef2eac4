//! Error types and handling for the weather relay

use thiserror::Error;

/// Main error type for the weather relay
#[derive(Error, Debug)]
pub enum WeatherError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Input validation errors, raised before any store mutation
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// No reading has been stored for the requested city
    #[error("No weather data for city '{city}'")]
    NotFound { city: String },

    /// A reading could not be serialized for the broker
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Broker connection, channel or publish failures
    #[error("Publish error: {message}")]
    Publish { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(city: S) -> Self {
        Self::NotFound { city: city.into() }
    }

    /// Create a new encoding error
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a new publish error
    pub fn publish<S: Into<String>>(message: S) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
            WeatherError::Validation { message } => format!("Invalid input: {message}"),
            WeatherError::NotFound { city } => format!("No weather data for city '{city}'"),
            WeatherError::Encoding { .. } | WeatherError::Publish { .. } | WeatherError::Io { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::encoding(err.to_string())
    }
}

impl From<lapin::Error> for WeatherError {
    fn from(err: lapin::Error) -> Self {
        WeatherError::publish(err.to_string())
    }
}
