//! Read and write flows over the store, with the broker tap on writes

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::Result;
use crate::events::{Destination, EventCodec, EventPublisher, PublishEvent};
use crate::models::{WeatherReading, validate_city};
use crate::store::WeatherStore;

/// Outcome of a successful write. The broker side never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted;

pub struct WeatherService {
    store: Arc<dyn WeatherStore>,
    publisher: EventPublisher,
    codec: EventCodec,
    destination: Destination,
}

impl WeatherService {
    pub fn new(
        store: Arc<dyn WeatherStore>,
        publisher: EventPublisher,
        destination: Destination,
    ) -> Self {
        Self {
            store,
            publisher,
            codec: EventCodec,
            destination,
        }
    }

    /// Latest reading for `city`, or `None` when nothing was ever written.
    #[instrument(skip(self))]
    pub async fn get_weather(&self, city: &str) -> Result<Option<WeatherReading>> {
        validate_city(city)?;
        Ok(self.store.get(city).await)
    }

    /// Stores `reading` and queues a snapshot of it for the broker.
    ///
    /// Only validation can fail. Encoding and publish problems are logged and
    /// the write is still accepted.
    #[instrument(skip(self, reading), fields(city = %reading.city))]
    pub async fn save_weather(&self, reading: WeatherReading) -> Result<Accepted> {
        reading.validate()?;

        // encoded before the store takes ownership, so later overwrites cannot
        // reach an event that is already queued
        let payload = self.codec.encode(&reading);

        let city = reading.city.clone();
        self.store.set(&city, reading).await;
        debug!("Weather stored");

        match payload {
            Ok(payload) => self.publisher.publish(PublishEvent {
                destination: self.destination.clone(),
                payload,
            }),
            Err(err) => error!(error = %err, "Skipping weather event, reading could not be encoded"),
        }

        Ok(Accepted)
    }
}
