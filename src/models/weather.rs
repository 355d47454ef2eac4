//! Weather reading model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, WeatherError};

/// Latest weather observation for one city.
///
/// Only `city` is interpreted. Every other member, `temperature` and
/// `condition` included, is payload: whatever JSON the client sent (strings,
/// objects, explicit `null`s) is carried through the store and onto the broker
/// unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Store key, case-sensitive and used verbatim
    #[serde(default)]
    pub city: String,
    /// Descriptive fields, kept in key order
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl WeatherReading {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_temperature(self, temperature: impl Into<Value>) -> Self {
        self.with_field("temperature", temperature.into())
    }

    #[must_use]
    pub fn with_condition(self, condition: impl Into<Value>) -> Self {
        self.with_field("condition", condition.into())
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn temperature(&self) -> Option<&Value> {
        self.fields.get("temperature")
    }

    pub fn condition(&self) -> Option<&Value> {
        self.fields.get("condition")
    }

    /// Structural check performed before the reading touches the store
    pub fn validate(&self) -> Result<()> {
        validate_city(&self.city)
    }
}

/// A city key must contain at least one non-whitespace character.
pub fn validate_city(city: &str) -> Result<()> {
    if city.trim().is_empty() {
        return Err(WeatherError::validation("city must not be empty"));
    }
    Ok(())
}
