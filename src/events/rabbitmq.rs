use std::collections::HashSet;

use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, options::*, types::FieldTable,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::codec::CONTENT_TYPE;
use super::publisher::{BrokerClient, Destination};
use crate::config::BrokerConfig;
use crate::{Result, WeatherError};

struct Session {
    connection: Connection,
    channel: Channel,
    declared: HashSet<Destination>,
}

impl Session {
    async fn close(self) {
        if let Err(err) = self.connection.close(0, "").await {
            debug!(error = %err, "Closing RabbitMQ connection failed");
        }
    }
}

/// What to do with a cached session before the next publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Reuse,
    ReopenChannel,
    Reconnect,
}

/// A dead connection takes its channels with it. A dead channel on a live
/// connection only needs a fresh channel.
fn recovery(connection_up: bool, channel_up: bool) -> Recovery {
    match (connection_up, channel_up) {
        (false, _) => Recovery::Reconnect,
        (true, false) => Recovery::ReopenChannel,
        (true, true) => Recovery::Reuse,
    }
}

/// AMQP 0-9-1 client that keeps one connection for the process.
///
/// The session is opened lazily. A failed channel is replaced on the same
/// connection; the connection itself is only reopened once it is down.
pub struct RabbitMqClient {
    config: BrokerConfig,
    session: Mutex<Option<Session>>,
}

impl RabbitMqClient {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    /// Opens the session up front so the first publish does not pay for it.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.open_session().await?);
        }
        Ok(())
    }

    /// Closes the connection, if any. The next publish opens a new one.
    pub async fn close(&self) {
        if let Some(session) = self.session.lock().await.take() {
            session.close().await;
            info!("Disconnected from RabbitMQ");
        }
    }

    async fn open_session(&self) -> Result<Session> {
        let connection = Connection::connect(&self.config.url, ConnectionProperties::default())
            .await
            .map_err(|e| WeatherError::publish(format!("Failed to connect to RabbitMQ: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| WeatherError::publish(format!("Failed to create channel: {e}")))?;

        info!(url = %redact(&self.config.url), "Connected to RabbitMQ");

        Ok(Session {
            connection,
            channel,
            declared: HashSet::new(),
        })
    }

    /// Brings a cached session back to a publishable state.
    async fn recover(&self, session: Session) -> Result<Session> {
        let decision = recovery(
            session.connection.status().connected(),
            session.channel.status().connected(),
        );
        match decision {
            Recovery::Reuse => Ok(session),
            Recovery::ReopenChannel => {
                warn!("RabbitMQ channel is closed, reopening it");
                match session.connection.create_channel().await {
                    Ok(channel) => Ok(Session {
                        channel,
                        declared: HashSet::new(),
                        ..session
                    }),
                    Err(e) => {
                        session.close().await;
                        Err(WeatherError::publish(format!("Failed to create channel: {e}")))
                    }
                }
            }
            Recovery::Reconnect => {
                warn!("RabbitMQ connection is closed, reconnecting");
                session.close().await;
                self.open_session().await
            }
        }
    }

    async fn declare(&self, channel: &Channel, destination: &Destination) -> Result<()> {
        channel
            .queue_declare(
                &destination.queue,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    auto_delete: self.config.auto_delete,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                WeatherError::publish(format!(
                    "Failed to declare queue {}: {e}",
                    destination.queue
                ))
            })?;

        // the default exchange routes by queue name and refuses explicit bindings
        if !destination.exchange.is_empty() {
            channel
                .queue_bind(
                    &destination.queue,
                    &destination.exchange,
                    &destination.routing_key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    WeatherError::publish(format!(
                        "Failed to bind queue {} to {}: {e}",
                        destination.queue, destination.exchange
                    ))
                })?;
        }

        debug!(
            exchange = %destination.exchange,
            queue = %destination.queue,
            routing_key = %destination.routing_key,
            "Declared event queue"
        );
        Ok(())
    }

    async fn try_publish(
        &self,
        session: &mut Session,
        destination: &Destination,
        payload: &[u8],
    ) -> Result<()> {
        if !session.declared.contains(destination) {
            self.declare(&session.channel, destination).await?;
            session.declared.insert(destination.clone());
        }

        // publisher confirms are not awaited
        let _confirm = session
            .channel
            .basic_publish(
                &destination.exchange,
                &destination.routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type(CONTENT_TYPE.into()),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BrokerClient for RabbitMqClient {
    async fn publish(&self, destination: &Destination, payload: &[u8]) -> Result<()> {
        let mut guard = self.session.lock().await;

        let mut session = match guard.take() {
            Some(session) => self.recover(session).await?,
            None => self.open_session().await?,
        };

        // kept even on failure; the next publish inspects its status
        let result = self.try_publish(&mut session, destination, payload).await;
        *guard = Some(session);
        result
    }
}

/// Strips credentials from an AMQP URL before it is logged.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
