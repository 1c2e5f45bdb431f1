//! The device location source.
//!
//! Started on every `connected` event. Runs one continuous sensor watch
//! that forwards readings into the controller queue; each reading is
//! turned into the local participant's location, remembered, and emitted
//! on the realtime channel. Sensor failures are logged and the watch keeps
//! running.

use std::sync::Arc;

use futures::StreamExt;
use livemap_channel::RealtimeChannel;
use livemap_types::ParticipantLocation;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::event::{ControllerEvent, ControllerSender};
use crate::sensor::{LocationSensor, PositionOptions, SensorError, SensorReading};

/// Owns the sensor watch and the local participant's last location.
pub struct DeviceLocationSource {
    sensor: Arc<dyn LocationSensor>,
    options: PositionOptions,
    watch: Option<JoinHandle<()>>,
    local: Option<ParticipantLocation>,
}

impl DeviceLocationSource {
    /// A stopped source over a sensor.
    pub fn new(sensor: Arc<dyn LocationSensor>, options: PositionOptions) -> Self {
        Self {
            sensor,
            options,
            watch: None,
            local: None,
        }
    }

    /// Begin watching. A running watch is replaced, so at most one is live.
    pub fn start(&mut self, events: ControllerSender, generation: u64) {
        let restarted = self.stop_watch();
        let mut readings = self.sensor.watch_position(&self.options);
        self.watch = Some(tokio::spawn(async move {
            while let Some(reading) = readings.next().await {
                if events
                    .send(ControllerEvent::Sensor {
                        generation,
                        reading,
                    })
                    .is_err()
                {
                    break;
                }
            }
            debug!(generation = generation, "position watch ended");
        }));
        info!(generation = generation, restarted = restarted, "device location watch started");
    }

    /// Handle one sensor outcome.
    ///
    /// A fix becomes the local location and is emitted on `channel`.
    /// Failures (sensor errors, no identity yet, emission errors) are
    /// logged and absorbed.
    pub fn on_reading(
        &mut self,
        channel: &RealtimeChannel,
        reading: Result<SensorReading, SensorError>,
    ) -> Option<&ParticipantLocation> {
        let reading = match reading {
            Ok(reading) => reading,
            Err(e) => {
                warn!(error = %e, "location sensor error");
                return None;
            }
        };

        let participant_id = match channel.identity() {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "dropping location reading");
                return None;
            }
        };

        let location = ParticipantLocation::new(participant_id, reading.coordinate);
        debug!(
            participant_id = %location.participant_id,
            location = %location.location,
            accuracy_m = reading.accuracy_m,
            "local location updated"
        );
        if let Err(e) = channel.emit_location(&location) {
            warn!(error = %e, "failed to emit local location");
        }
        self.local = Some(location);
        self.local.as_ref()
    }

    /// The local participant's last location, if any fix has arrived.
    pub const fn local_location(&self) -> Option<&ParticipantLocation> {
        self.local.as_ref()
    }

    /// Whether a watch is running.
    pub fn is_watching(&self) -> bool {
        self.watch.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop watching and forget the local location.
    pub fn stop(&mut self) {
        if self.stop_watch() {
            info!("device location watch stopped");
        }
        self.local = None;
    }

    fn stop_watch(&mut self) -> bool {
        match self.watch.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for DeviceLocationSource {
    fn drop(&mut self) {
        self.stop_watch();
    }
}

impl std::fmt::Debug for DeviceLocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceLocationSource")
            .field("options", &self.options)
            .field("watching", &self.watch.is_some())
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}
