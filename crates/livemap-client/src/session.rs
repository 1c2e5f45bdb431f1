//! The console session loop.
//!
//! Interleaves controller events with console commands on one task, so a
//! command and an event never run at the same time.

use std::fmt::Write as _;
use std::sync::Arc;

use livemap_core::{Activation, BroadcastSensor, ControllerError, MapController, SensorReading};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::console::{self, Command, HELP};
use crate::error::ClientError;

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text for the console.
    Reply(String),
    /// End the session.
    Quit,
}

/// A controller plus the sensor the console feeds.
#[derive(Debug)]
pub struct Session {
    controller: MapController,
    sensor: Arc<BroadcastSensor>,
}

impl Session {
    /// Wrap an initialised controller.
    pub const fn new(controller: MapController, sensor: Arc<BroadcastSensor>) -> Self {
        Self { controller, sensor }
    }

    /// Run one command against the controller.
    pub async fn execute(&mut self, command: Command) -> Result<Outcome, ControllerError> {
        let reply = match command {
            Command::Fix(coordinate) => {
                let watches = self.sensor.push(Ok(SensorReading::now(coordinate)));
                format!("fix {coordinate} sent to {watches} watch(es)")
            }
            Command::SensorError(error) => {
                let watches = self.sensor.push(Err(error.clone()));
                format!("sensor error `{error}` sent to {watches} watch(es)")
            }
            Command::Locate(query) => match self.controller.fly_to_address(&query).await? {
                Some(found) => format!("flying to {found}"),
                None => format!("no match for `{query}`"),
            },
            Command::Fly(target) => {
                self.controller.fly_to(target)?;
                format!("flying to {target}")
            }
            Command::Route(participant_id) => {
                let Some(entry) = self.controller.registry().get(&participant_id) else {
                    return Ok(Outcome::Reply(format!("unknown participant `{participant_id}`")));
                };
                let marker = entry.marker;
                match self.controller.activate_marker(marker, &Activation::Click).await? {
                    Some(path) => format!(
                        "route to {participant_id}: {} vertices, {} m",
                        path.coordinates.len(),
                        path.length_m.map_or_else(|| String::from("?"), |m| format!("{m:.0}"))
                    ),
                    None => String::from("no local location yet, send a `fix` first"),
                }
            }
            Command::Style => format!("style is now {}", self.controller.toggle_style()?),
            Command::Tile(style_id) => self.controller.tile_url(&style_id),
            Command::Markers => {
                let registry = self.controller.registry();
                let mut out = format!("{} participant(s)", registry.len());
                for entry in registry.entries() {
                    let _ = write!(out, "\n  {} at {}", entry.participant_id, entry.location);
                }
                out
            }
            Command::Help => String::from(HELP),
            Command::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Reply(reply))
    }

    /// Serve commands from `input` until `quit` or end of input, handling
    /// controller events in between.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<(), ClientError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            tokio::select! {
                event = self.controller.next_event() => {
                    if let Some(event) = event {
                        self.controller.handle_event(event).await;
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("console input closed");
                        break;
                    };
                    let reply = match console::parse(&line) {
                        Ok(command) => match self.execute(command).await {
                            Ok(Outcome::Reply(reply)) => reply,
                            Ok(Outcome::Quit) => break,
                            Err(e) => {
                                warn!(error = %e, "command failed");
                                format!("error: {e}")
                            }
                        },
                        Err(console::ParseError::Empty) => continue,
                        Err(e) => e.to_string(),
                    };
                    output.write_all(reply.as_bytes()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
            }
        }
        info!("console session ended");
        Ok(())
    }

    /// Tear down the map.
    pub fn shutdown(&mut self) {
        self.controller.destroy();
    }
}
