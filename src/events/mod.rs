//! Broker side channel for weather writes
//!
//! - `codec`: JSON encoding of readings for transport
//! - `publisher`: detached, ordered dispatch of encoded events
//! - `rabbitmq`: AMQP implementation of the broker client

pub mod codec;
pub mod publisher;
pub mod rabbitmq;

pub use codec::{CONTENT_TYPE, EventCodec};
pub use publisher::{
    BrokerClient, DEFAULT_EXCHANGE, Destination, EventPublisher, PublishEvent, PublisherHandle,
    WEATHER_EVENT,
};
pub use rabbitmq::RabbitMqClient;
