use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{error, info, warn};
use rumqttc::{Client, Event, LastWill, MqttOptions, Packet, QoS};

use crate::config::MqttConfig;
use crate::types::DataPoint;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Subscribes to the accelerometer topic and forwards every reading to
/// `data_sender` until the shutdown flag is raised, the receiving side goes
/// away, or the connection fails.
pub fn run_mqtt_client(
    config: &MqttConfig,
    data_sender: Sender<DataPoint>,
    shutdown_signal: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mqtt_options = MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);

    match (env::var("MQTT_USER"), env::var("MQTT_PASS")) {
        (Ok(user), Ok(pass)) => {
            mqtt_options.set_credentials(user, pass);
        }
        _ => info!("MQTT_USER/MQTT_PASS not set, connecting anonymously"),
    }

    let qos = qos_from_level(config.qos);
    mqtt_options
        .set_keep_alive(Duration::from_secs(u64::from(config.keep_alive)))
        .set_last_will(LastWill::new(config.topic.clone(), "offline", qos, false));

    let (client, mut connection) = Client::new(mqtt_options, 10);
    client.subscribe(config.topic.clone(), qos)?;
    info!(
        "MQTT client subscribed to '{}' on {}:{}",
        config.topic, config.broker, config.port
    );

    for event in connection.iter() {
        if shutdown_signal.load(Ordering::Relaxed) {
            info!("MQTT thread received shutdown signal, exiting gracefully");
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == config.topic => {
                match parse_sensor_data(&publish.payload) {
                    Ok(data) => {
                        if data_sender.send(data).is_err() {
                            info!("Sensor data channel disconnected, MQTT thread exiting");
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid sensor data: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}

/// Decodes one `{"x":..,"y":..,"z":..,"timestamp":..}` payload.
pub fn parse_sensor_data(payload: &[u8]) -> Result<DataPoint, PayloadError> {
    let payload_str = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str::<DataPoint>(payload_str)?)
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}
