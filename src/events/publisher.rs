//! Fire-and-forget publication of write events.
//!
//! The write path hands a [`PublishEvent`] to [`EventPublisher::publish`], which
//! only enqueues it. A single dispatch task drains the queue in submission order
//! and forwards each payload to the [`BrokerClient`]. Failures are logged and
//! dropped there, so nothing on the broker side can reach an HTTP response.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::Result;

/// Event type identifier, used as both queue name and routing key.
pub const WEATHER_EVENT: &str = "weather-event";

/// Pre-declared direct exchange the event queue is bound to.
pub const DEFAULT_EXCHANGE: &str = "amq.direct";

/// Broker-side address of a published message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Destination {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::new(DEFAULT_EXCHANGE, WEATHER_EVENT, WEATHER_EVENT)
    }
}

/// Serialized snapshot of one write, taken when the write happened.
#[derive(Debug, Clone)]
pub struct PublishEvent {
    pub destination: Destination,
    pub payload: Vec<u8>,
}

/// Something that can put bytes on a broker.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    async fn publish(&self, destination: &Destination, payload: &[u8]) -> Result<()>;
}

/// Cheap, cloneable entry point of the publish side channel.
#[derive(Clone)]
pub struct EventPublisher {
    sender: UnboundedSender<PublishEvent>,
}

/// Owns the dispatch task. Used on shutdown to flush queued events.
pub struct PublisherHandle {
    task: JoinHandle<()>,
}

impl EventPublisher {
    /// Starts the dispatch task on the current tokio runtime.
    pub fn spawn(client: Arc<dyn BrokerClient>) -> (Self, PublisherHandle) {
        let (sender, receiver) = unbounded_channel();
        let task = tokio::spawn(dispatch_loop(client, receiver));
        (Self { sender }, PublisherHandle { task })
    }

    /// Queues an event and returns immediately. Never fails.
    pub fn publish(&self, event: PublishEvent) {
        if let Err(err) = self.sender.send(event) {
            warn!(
                routing_key = %err.0.destination.routing_key,
                "Publisher is shut down, dropping event"
            );
        }
    }
}

impl PublisherHandle {
    /// Waits for the queue to drain once every [`EventPublisher`] clone is gone.
    ///
    /// Returns `false` if `timeout` elapsed first; the remaining events are lost.
    pub async fn drain(self, timeout: Duration) -> bool {
        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "Publisher task ended abnormally");
                true
            }
            Err(_) => {
                warn!(?timeout, "Publisher did not drain in time, pending events are lost");
                task.abort();
                false
            }
        }
    }
}

async fn dispatch_loop(
    client: Arc<dyn BrokerClient>,
    mut receiver: UnboundedReceiver<PublishEvent>,
) {
    debug!("Publisher dispatch loop started");
    while let Some(event) = receiver.recv().await {
        let destination = &event.destination;
        match client.publish(destination, &event.payload).await {
            Ok(()) => debug!(
                exchange = %destination.exchange,
                routing_key = %destination.routing_key,
                bytes = event.payload.len(),
                "Published weather event"
            ),
            Err(err) => warn!(
                exchange = %destination.exchange,
                routing_key = %destination.routing_key,
                error = %err,
                "Failed to publish weather event"
            ),
        }
    }
    info!("Publisher dispatch loop stopped");
}
