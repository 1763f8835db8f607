//! # Console Channel
//!
//! Line-oriented operator requests of the form `K<code>`.
//!
//! A valid request is echoed as `K<code>\n`, followed by the result lines and
//! `OK\n`. Requests that need the radio are returned as a [`ConsoleAction`]
//! for the node to carry out; the console itself only reads the store.

use crate::config::Role;
use crate::error::{Result, TelemetryLinkError};
use crate::telemetry::present::{self, OutputMode};
use crate::telemetry::store::TelemetryStore;

/// Reply to unparseable input
pub const INVALID_REPLY: &str = "invalid command\n";

/// Terminator of a successfully handled request
pub const OK_REPLY: &str = "OK\n";

/// Known request codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Power,
    Imu,
    Gps,
    PhotoresistorCalibrated,
    PhotoresistorRaw,
    Calibration,
}

impl Command {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Command::Ping),
            30 => Some(Command::Power),
            31 => Some(Command::Imu),
            36 => Some(Command::Gps),
            42 => Some(Command::PhotoresistorCalibrated),
            43 => Some(Command::PhotoresistorRaw),
            70 => Some(Command::Calibration),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Command::Ping => 1,
            Command::Power => 30,
            Command::Imu => 31,
            Command::Gps => 36,
            Command::PhotoresistorCalibrated => 42,
            Command::PhotoresistorRaw => 43,
            Command::Calibration => 70,
        }
    }
}

/// Radio work requested by a console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleAction {
    None,
    SendPing,
    RequestCalibration,
}

/// Text to print plus any radio work to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleReply {
    pub output: String,
    pub action: ConsoleAction,
}

impl ConsoleReply {
    fn text(output: String) -> Self {
        Self {
            output,
            action: ConsoleAction::None,
        }
    }
}

/// Parse `K<integer>`
///
/// Only the leading integer after `K` counts; anything after it on the line
/// is ignored.
///
/// # Errors
///
/// Returns `InvalidCommand` if the line does not start with `K`, has no
/// integer after it, or the integer is zero.
pub fn parse_request(line: &str) -> Result<i32> {
    let invalid = || TelemetryLinkError::InvalidCommand(line.trim().to_string());

    let rest = line.trim_start().strip_prefix('K').ok_or_else(invalid)?;

    let digits_start = usize::from(rest.starts_with('-'));
    let digits_len = rest[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return Err(invalid());
    }

    let code: i32 = rest[..digits_start + digits_len].parse().map_err(|_| invalid())?;
    if code == 0 {
        return Err(invalid());
    }
    Ok(code)
}

/// Request handler bound to an output mode and node role
#[derive(Debug, Clone, Copy)]
pub struct Console {
    mode: OutputMode,
    role: Role,
}

impl Console {
    pub fn new(mode: OutputMode, role: Role) -> Self {
        Self { mode, role }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Handle one input line
    ///
    /// Blank lines produce no output.
    pub fn handle_line(&self, line: &str, store: &TelemetryStore) -> ConsoleReply {
        if line.trim().is_empty() {
            return ConsoleReply::text(String::new());
        }

        let code = match parse_request(line) {
            Ok(code) => code,
            Err(_) => return ConsoleReply::text(INVALID_REPLY.to_string()),
        };

        let mut output = format!("K{}\n", code);
        let Some(command) = Command::from_code(code) else {
            output.push_str(&format!("command \"{}\" is invalid\n", code));
            return ConsoleReply::text(output);
        };

        let mut action = ConsoleAction::None;
        match command {
            Command::Ping => action = ConsoleAction::SendPing,
            Command::Power => output.push_str(&present::render_power(store.power(), self.mode)),
            Command::Imu => output.push_str(&present::render_imu(store.imu(), self.mode)),
            Command::Gps => output.push_str(&present::render_gps(store.gps(), self.mode)),
            Command::PhotoresistorCalibrated => output.push_str(&present::render_photoresistor_calibrated(
                store.photoresistor(),
                store.calibration(),
                self.mode,
            )),
            Command::PhotoresistorRaw => {
                output.push_str(&present::render_photoresistor_raw(store.photoresistor(), self.mode))
            }
            Command::Calibration => {
                if self.role == Role::Ground && !store.calibration().is_complete() {
                    action = ConsoleAction::RequestCalibration;
                } else {
                    output.push_str(&present::render_calibration(store.calibration(), self.mode));
                }
            }
        }

        output.push_str(OK_REPLY);
        ConsoleReply { output, action }
    }
}
