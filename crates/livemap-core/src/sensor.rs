//! Device location sensors.
//!
//! A [`LocationSensor`] hands out continuous position watches as streams.
//! [`BroadcastSensor`] is fed by whoever owns it (the console client
//! pushes readings typed on stdin) and fans every reading out to all
//! active watches.

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use livemap_types::Coordinate;
use tokio::sync::broadcast;
use tracing::debug;

/// Options for a position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for the most accurate fix the device can give.
    pub enable_high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
        }
    }
}

/// One position fix.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Where the device is.
    pub coordinate: Coordinate,
    /// Accuracy radius in metres, if known.
    pub accuracy_m: Option<f64>,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    /// A fix taken now with unknown accuracy.
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            accuracy_m: None,
            timestamp: Utc::now(),
        }
    }
}

/// Why a reading could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// The user denied location access.
    #[error("location permission denied")]
    PermissionDenied,
    /// The device could not determine its position.
    #[error("position unavailable")]
    PositionUnavailable,
    /// No fix within the sensor's time limit.
    #[error("location request timed out")]
    Timeout,
}

/// Stream of readings from one watch. Ends when the sensor goes away.
pub type SensorStream = BoxStream<'static, Result<SensorReading, SensorError>>;

/// A source of device positions.
pub trait LocationSensor: Send + Sync {
    /// Start a continuous watch. Errors are delivered in-stream and do not
    /// end it.
    fn watch_position(&self, options: &PositionOptions) -> SensorStream;
}

/// A sensor driven by [`push`](Self::push).
#[derive(Debug, Clone)]
pub struct BroadcastSensor {
    tx: broadcast::Sender<Result<SensorReading, SensorError>>,
}

impl BroadcastSensor {
    /// A sensor buffering up to `capacity` readings per lagging watch.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver a reading or failure to every active watch.
    ///
    /// Returns the number of watches that received it.
    pub fn push(&self, reading: Result<SensorReading, SensorError>) -> usize {
        self.tx.send(reading).unwrap_or(0)
    }

    /// Number of active watches.
    pub fn watchers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSensor {
    fn default() -> Self {
        Self::new(16)
    }
}

impl LocationSensor for BroadcastSensor {
    fn watch_position(&self, options: &PositionOptions) -> SensorStream {
        debug!(high_accuracy = options.enable_high_accuracy, "position watch started");
        let rx = self.tx.subscribe();
        Box::pin(stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(reading) => return Some((reading, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped = skipped, "position watch lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn readings_and_errors_reach_every_watch() {
        let sensor = BroadcastSensor::default();
        let mut a = sensor.watch_position(&PositionOptions::default());
        let mut b = sensor.watch_position(&PositionOptions::default());
        assert_eq!(sensor.watchers(), 2);

        assert_eq!(sensor.push(Err(SensorError::Timeout)), 2);
        let fix = SensorReading::now(Coordinate::new(50.0, 20.0));
        sensor.push(Ok(fix.clone()));

        assert_eq!(a.next().await, Some(Err(SensorError::Timeout)));
        assert_eq!(a.next().await, Some(Ok(fix.clone())));
        assert_eq!(b.next().await, Some(Err(SensorError::Timeout)));
        assert_eq!(b.next().await, Some(Ok(fix)));
    }

    #[test]
    fn push_without_watchers_is_dropped() {
        let sensor = BroadcastSensor::default();
        assert_eq!(sensor.push(Err(SensorError::PositionUnavailable)), 0);
    }

    #[tokio::test]
    async fn dropping_sensor_ends_watch() {
        let sensor = BroadcastSensor::default();
        let mut watch = sensor.watch_position(&PositionOptions::default());
        drop(sensor);
        assert_eq!(watch.next().await, None);
    }
}
