use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::WeatherReading;

/// Holds the latest reading per city.
///
/// Absence is a normal outcome and is reported as `None`, never as an error.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    async fn get(&self, city: &str) -> Option<WeatherReading>;

    /// Replaces whatever is stored for `city`. No merging.
    async fn set(&self, city: &str, reading: WeatherReading);
}

/// Process-lifetime store guarded by a single lock, so a reader never sees a
/// half-replaced reading.
#[derive(Default)]
pub struct InMemoryWeatherStore {
    readings: RwLock<HashMap<String, WeatherReading>>,
}

impl InMemoryWeatherStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}

#[async_trait]
impl WeatherStore for InMemoryWeatherStore {
    #[tracing::instrument(name = "query_store", level = "debug", skip(self))]
    async fn get(&self, city: &str) -> Option<WeatherReading> {
        let reading = self.readings.read().await.get(city).cloned();
        if reading.is_none() {
            tracing::debug!("City not found");
        }
        reading
    }

    #[tracing::instrument(name = "put_store", level = "debug", skip(self, reading))]
    async fn set(&self, city: &str, reading: WeatherReading) {
        let previous = self.readings.write().await.insert(city.to_owned(), reading);
        tracing::debug!(replaced = previous.is_some(), "Reading stored");
    }
}
