//! Where accelerometer readings come from.

pub mod channel;
pub mod manual;
pub mod mqtt;

pub use channel::ChannelSensor;
pub use manual::ManualSensor;
pub use mqtt::{parse_sensor_data, run_mqtt_client, PayloadError};

use crate::types::DataPoint;

/// Invoked once per reading, never concurrently with itself.
pub type SampleCallback = Box<dyn FnMut(DataPoint) + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("accelerometer is not available")]
    Unavailable,
    #[error("failed to subscribe to accelerometer: {0}")]
    Subscribe(String),
}

/// A stream of tri-axial readings.
pub trait SensorSource: Send + Sync {
    fn is_available(&self) -> bool;

    /// Starts delivering readings to `on_sample` until the returned
    /// subscription is cancelled or dropped.
    fn subscribe(&self, on_sample: SampleCallback) -> Result<Subscription, SensorError>;
}

/// Handle to a running sensor stream. Once `cancel` returns, the callback
/// passed to `subscribe` is not invoked again.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
