//! Console command parsing.
//!
//! One command per line; the first word selects the command.

use livemap_core::SensorError;
use livemap_types::{Coordinate, CoordinateError, ParticipantId};

/// Help text printed by `help`.
pub const HELP: &str = "\
commands:
  fix <lat> <lon>          report a device location fix
  sensor-error [kind]      report a sensor failure (denied, unavailable, timeout)
  locate <query>           geocode a place and fly to it
  fly <lat> <lon>          fly the camera to a coordinate
  route <participant>      draw the route from a participant to you
  style                    toggle standard / satellite
  tile <style>             print the tile resource for a style id
  markers                  list participants on the map
  help                     show this text
  quit                     leave";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Device location fix.
    Fix(Coordinate),
    /// Device sensor failure.
    SensorError(SensorError),
    /// Geocode and fly.
    Locate(String),
    /// Fly to a coordinate.
    Fly(Coordinate),
    /// Activate a participant's marker.
    Route(ParticipantId),
    /// Toggle the map style.
    Style,
    /// Tile resource for a style id.
    Tile(String),
    /// List participants.
    Markers,
    /// Show help.
    Help,
    /// Leave.
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Blank line.
    #[error("empty command")]
    Empty,
    /// First word is not a command.
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    /// Missing or extra arguments.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// An argument is not a usable number.
    #[error("invalid coordinate: {0}")]
    InvalidNumber(#[from] CoordinateError),
}

/// Parse one console line.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    match word {
        "" => Err(ParseError::Empty),
        "fix" => coordinate(rest, "fix <lat> <lon>").map(Command::Fix),
        "fly" => coordinate(rest, "fly <lat> <lon>").map(Command::Fly),
        "sensor-error" => match rest {
            "" | "unavailable" => Ok(Command::SensorError(SensorError::PositionUnavailable)),
            "denied" => Ok(Command::SensorError(SensorError::PermissionDenied)),
            "timeout" => Ok(Command::SensorError(SensorError::Timeout)),
            _ => Err(ParseError::Usage("sensor-error [denied|unavailable|timeout]")),
        },
        "locate" => non_empty(rest, "locate <query>").map(|q| Command::Locate(q.to_owned())),
        "route" => single(rest, "route <participant>").map(|id| Command::Route(ParticipantId::new(id))),
        "tile" => single(rest, "tile <style>").map(|id| Command::Tile(id.to_owned())),
        "style" => no_args(rest, "style", Command::Style),
        "markers" => no_args(rest, "markers", Command::Markers),
        "help" => no_args(rest, "help", Command::Help),
        "quit" | "exit" => no_args(rest, "quit", Command::Quit),
        other => Err(ParseError::Unknown(other.to_owned())),
    }
}

fn coordinate(args: &str, usage: &'static str) -> Result<Coordinate, ParseError> {
    let mut parts = args.split_whitespace();
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ParseError::Usage(usage));
    };
    Ok(Coordinate::parse_degrees(lat, lon)?)
}

fn non_empty<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    if args.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(args)
    }
}

fn single<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(word), None) => Ok(word),
        _ => Err(ParseError::Usage(usage)),
    }
}

fn no_args(args: &str, usage: &'static str, command: Command) -> Result<Command, ParseError> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::Usage(usage))
    }
}
