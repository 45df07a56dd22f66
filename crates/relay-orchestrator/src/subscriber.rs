//! MQTT subscription to Frigate events.

use std::sync::Arc;
use std::time::Duration;

use relay_core::RelayConfig;
use rumqttc::{AsyncClient, Event as MqttEvent, Incoming, MqttOptions, QoS, Transport};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::orchestrator::{Disposition, EventOrchestrator};

/// Pause after a connection error before polling again.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Frigate event payloads carry zone and attribute lists.
const MAX_PACKET_SIZE: usize = 256 * 1024;

/// Build client options from the relay configuration.
pub fn mqtt_options(config: &RelayConfig) -> Result<MqttOptions> {
    let endpoint = config.mqtt_endpoint()?;

    let mut options = MqttOptions::new(&config.mqtt_client_id, &endpoint.host, endpoint.port);
    options.set_keep_alive(KEEP_ALIVE);
    options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
    if let Some(user) = &config.mqtt_user {
        options.set_credentials(user, config.mqtt_password.clone().unwrap_or_default());
    }
    if endpoint.use_tls {
        options.set_transport(Transport::tls_with_default_config());
    }
    Ok(options)
}

/// Feeds every published event to the orchestrator.
///
/// Publishes are handled one at a time on the polling task; only clip
/// downloads leave it.
pub struct MqttSubscriber {
    options: MqttOptions,
    topic: String,
    orchestrator: Arc<EventOrchestrator>,
    shutdown: watch::Receiver<bool>,
}

impl MqttSubscriber {
    pub fn new(
        options: MqttOptions,
        topic: impl Into<String>,
        orchestrator: Arc<EventOrchestrator>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            options,
            topic: topic.into(),
            orchestrator,
            shutdown,
        }
    }

    /// Poll the broker until shutdown is signalled.
    ///
    /// The subscription is renewed on every ConnAck so it survives broker
    /// reconnects.
    pub async fn run(mut self) -> Result<()> {
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), 10);
        info!(
            broker = %self.options.broker_address().0,
            topic = %self.topic,
            "Starting MQTT subscriber"
        );

        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(MqttEvent::Incoming(Incoming::ConnAck(_))) => {
                        info!(topic = %self.topic, "Connected to MQTT broker, subscribing");
                        client.subscribe(&self.topic, QoS::AtLeastOnce).await?;
                    }
                    Ok(MqttEvent::Incoming(Incoming::Publish(publish))) => {
                        debug!(topic = %publish.topic, size = publish.payload.len(), "Event received");
                        handle_publish(&self.orchestrator, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, delay_secs = RECONNECT_DELAY.as_secs(), "MQTT connection error, retrying");
                        if wait_or_shutdown(&mut self.shutdown, RECONNECT_DELAY).await {
                            info!("MQTT subscriber received shutdown signal");
                            break;
                        }
                    }
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("MQTT subscriber received shutdown signal");
                        break;
                    }
                }
            }
        }

        if let Err(e) = client.try_disconnect() {
            debug!(error = %e, "MQTT disconnect failed");
        }
        Ok(())
    }
}

/// Sleep for `delay`, returning `true` early if shutdown is signalled.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    let pause = sleep(delay);
    tokio::pin!(pause);
    loop {
        tokio::select! {
            _ = &mut pause => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

async fn handle_publish(orchestrator: &EventOrchestrator, payload: &[u8]) {
    match orchestrator.handle_payload(payload).await {
        Ok(Disposition::ClipDispatched(_)) => debug!("Clip delivery running in background"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Dropping malformed event payload"),
    }
}
