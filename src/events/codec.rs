use crate::Result;
use crate::models::WeatherReading;

/// Content type of every payload handed to the broker.
pub const CONTENT_TYPE: &str = "application/json";

/// JSON codec for the broker path. HTTP responses are rendered by axum, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec;

impl EventCodec {
    /// Serialize a reading. Field order is fixed, so equal readings give equal bytes.
    pub fn encode(&self, reading: &WeatherReading) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(reading)?)
    }

    pub fn decode(&self, payload: &[u8]) -> Result<WeatherReading> {
        Ok(serde_json::from_slice(payload)?)
    }
}
