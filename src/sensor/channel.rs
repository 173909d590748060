use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{error, info};

use crate::types::DataPoint;

use super::{SampleCallback, SensorError, SensorSource, Subscription};

/// Sensor fed through a crossbeam channel, typically by the MQTT client thread.
///
/// Each subscription runs one worker thread that drains the channel and hands
/// readings to the callback.
pub struct ChannelSensor {
    receiver: Receiver<DataPoint>,
    poll_interval: Duration,
}

impl ChannelSensor {
    pub fn new(receiver: Receiver<DataPoint>) -> Self {
        Self {
            receiver,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl SensorSource for ChannelSensor {
    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&self, mut on_sample: SampleCallback) -> Result<Subscription, SensorError> {
        let receiver = self.receiver.clone();
        let poll_interval = self.poll_interval;
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("sample-worker".into())
            .spawn(move || {
                info!("Sample worker started");
                while !worker_shutdown.load(Ordering::Relaxed) {
                    match receiver.recv_timeout(poll_interval) {
                        Ok(point) => on_sample(point),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            info!("Sample channel disconnected, worker exiting");
                            break;
                        }
                    }
                }
                info!("Sample worker stopped");
            })
            .map_err(|e| SensorError::Subscribe(e.to_string()))?;

        Ok(Subscription::new(move || {
            shutdown.store(true, Ordering::Relaxed);
            // cancelled from its own callback: the worker exits after returning
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                error!("Sample worker panicked");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::sync::Mutex;

    #[test]
    fn test_delivers_until_cancelled() {
        let (sender, receiver) = bounded(16);
        let sensor = ChannelSensor::new(receiver);
        assert!(sensor.is_available());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (done_tx, done_rx) = bounded(16);
        let subscription = sensor
            .subscribe(Box::new(move |point: DataPoint| {
                sink.lock().unwrap().push(point.timestamp);
                done_tx.send(()).unwrap();
            }))
            .unwrap();

        for t in [0, 50, 100] {
            sender.send(DataPoint::new(0.0, 0.0, 9.8, t)).unwrap();
        }
        for _ in 0..3 {
            done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        subscription.cancel();

        sender.send(DataPoint::new(0.0, 0.0, 9.8, 150)).unwrap();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);
    }

    #[test]
    fn test_cancel_from_own_callback() {
        let (sender, receiver) = bounded(16);
        let sensor = ChannelSensor::new(receiver);

        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let own = Arc::clone(&slot);
        let (done_tx, done_rx) = bounded(16);
        let subscription = sensor
            .subscribe(Box::new(move |point: DataPoint| {
                if let Some(subscription) = own.lock().unwrap().take() {
                    subscription.cancel();
                }
                done_tx.send(point.timestamp).unwrap();
            }))
            .unwrap();
        *slot.lock().unwrap() = Some(subscription);

        sender.send(DataPoint::new(0.0, 0.0, 9.8, 0)).unwrap();
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);

        thread::sleep(Duration::from_millis(250));
        sender.send(DataPoint::new(0.0, 0.0, 9.8, 50)).unwrap();
        assert!(done_rx.recv_timeout(Duration::from_millis(250)).is_err());
    }

    #[test]
    fn test_worker_exits_when_sender_dropped() {
        let (sender, receiver) = bounded::<DataPoint>(1);
        let sensor = ChannelSensor::new(receiver);
        let subscription = sensor.subscribe(Box::new(|_| {})).unwrap();

        drop(sender);
        // joins promptly since the worker already left its loop
        subscription.cancel();
    }
}
