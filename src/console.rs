/// Line console facade over the radio controller.
///
/// Parses one command line, validates its arguments, runs it against the
/// [`RadioController`] and writes a one-line human-readable result. Returns
/// a shell-style exit code: 0 on success, 1 on usage, validation or
/// radio errors.
use core::fmt::Write;

use crate::channel::{Channel, MAX_CHANNEL, MIN_CHANNEL};
use crate::radio::{Radio, RadioController};

/// Maximum accepted command line length
pub const MAX_LINE_LEN: usize = 256;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

const MAX_ARGS: usize = 8;

/// A registered console command.
pub struct CommandSpec {
    pub name: &'static str,
    pub help: &'static str,
    /// Argument synopsis, if the command takes any
    pub hint: Option<&'static str>,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "start_sniffer",
        help: "Start the IEEE 802.15.4 sniffer",
        hint: None,
    },
    CommandSpec {
        name: "stop_sniffer",
        help: "Stop the IEEE 802.15.4 sniffer",
        hint: None,
    },
    CommandSpec {
        name: "set_channel",
        help: "Set the sniffer channel (11-26)",
        hint: Some("<channel>"),
    },
    CommandSpec {
        name: "sleep_sniffer",
        help: "Put the IEEE 802.15.4 radio into sleep mode",
        hint: None,
    },
    CommandSpec {
        name: "status",
        help: "Show radio state and channel",
        hint: None,
    },
    CommandSpec {
        name: "help",
        help: "Print the list of registered commands",
        hint: None,
    },
];

/// A parsed, validated console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartSniffer,
    StopSniffer,
    SleepSniffer,
    SetChannel(Channel),
    Status,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line
    Empty,
    Unrecognized,
    /// Wrong argument count; carries the usage synopsis
    Usage(&'static str),
    /// Channel argument outside 11..=26
    ChannelRange,
}

/// Parse a command line.
///
/// Commands without arguments ignore anything after the command name. The
/// channel argument is read like C `atoi`: leading digits only, 0 when there
/// are none (and so rejected as out of range).
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut args: heapless::Vec<&str, MAX_ARGS> = heapless::Vec::new();
    for word in line.split_whitespace() {
        if args.push(word).is_err() {
            break;
        }
    }

    let Some(&name) = args.first() else {
        return Err(ParseError::Empty);
    };

    match name {
        "start_sniffer" => Ok(Command::StartSniffer),
        "stop_sniffer" => Ok(Command::StopSniffer),
        "sleep_sniffer" => Ok(Command::SleepSniffer),
        "status" => Ok(Command::Status),
        "help" => Ok(Command::Help),
        "set_channel" => {
            if args.len() != 2 {
                return Err(ParseError::Usage("set_channel <channel>"));
            }
            let value = leading_int(args[1]);
            Channel::new(value)
                .map(Command::SetChannel)
                .map_err(|_| ParseError::ChannelRange)
        }
        _ => Err(ParseError::Unrecognized),
    }
}

/// Optional sign followed by decimal digits; parsing stops at the first
/// other byte. Saturates instead of overflowing.
fn leading_int(arg: &str) -> i32 {
    let (negative, digits) = match arg.as_bytes() {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        rest => (false, rest),
    };
    let magnitude = digits
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0i32, |acc, b| {
            acc.saturating_mul(10).saturating_add((b - b'0') as i32)
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Command facade. Owns the controller it drives.
pub struct Console<R: Radio> {
    controller: RadioController<R>,
}

impl<R: Radio> Console<R> {
    pub fn new(controller: RadioController<R>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &RadioController<R> {
        &self.controller
    }

    /// Run one command line, writing its output to `out`. Returns the exit code.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> i32 {
        match parse_command(line) {
            Ok(cmd) => self.run(cmd, out),
            Err(ParseError::Empty) => EXIT_SUCCESS,
            Err(ParseError::Unrecognized) => {
                let _ = writeln!(out, "Unrecognized command");
                EXIT_FAILURE
            }
            Err(ParseError::Usage(usage)) => {
                let _ = writeln!(out, "Usage: {}", usage);
                EXIT_FAILURE
            }
            Err(ParseError::ChannelRange) => {
                let _ = writeln!(
                    out,
                    "Channel must be between {} and {} for IEEE 802.15.4",
                    MIN_CHANNEL, MAX_CHANNEL
                );
                EXIT_FAILURE
            }
        }
    }

    fn run<W: Write>(&mut self, cmd: Command, out: &mut W) -> i32 {
        let (result, action) = match cmd {
            Command::StartSniffer => (self.controller.start_receive(), "start"),
            Command::StopSniffer => (self.controller.stop_receive(), "stop"),
            Command::SleepSniffer => (self.controller.sleep(), "sleep"),
            Command::SetChannel(channel) => {
                return match self.controller.set_channel(channel.get() as i32) {
                    Ok(channel) => {
                        let _ = writeln!(out, "Channel set to {}", channel);
                        EXIT_SUCCESS
                    }
                    Err(e) => {
                        let _ = writeln!(out, "{}", e);
                        EXIT_FAILURE
                    }
                };
            }
            Command::Status => {
                let _ = writeln!(
                    out,
                    "State: {}, channel {}",
                    self.controller.state(),
                    self.controller.channel()
                );
                return EXIT_SUCCESS;
            }
            Command::Help => {
                write_help(out);
                return EXIT_SUCCESS;
            }
        };

        match result {
            Ok(_) => {
                let msg = match cmd {
                    Command::StartSniffer => "Sniffer started",
                    Command::StopSniffer => "Sniffer stopped",
                    _ => "Sniffer sleeping",
                };
                let _ = writeln!(out, "{}", msg);
                EXIT_SUCCESS
            }
            Err(e) => {
                log::error!("Failed to {} sniffer: {}", action, e);
                let _ = writeln!(out, "Failed to {} sniffer: {}", action, e);
                EXIT_FAILURE
            }
        }
    }
}

fn write_help<W: Write>(out: &mut W) {
    for spec in COMMANDS {
        match spec.hint {
            Some(hint) => {
                let _ = writeln!(out, "{} {}", spec.name, hint);
            }
            None => {
                let _ = writeln!(out, "{}", spec.name);
            }
        }
        let _ = writeln!(out, "  {}", spec.help);
    }
}

// ── Serial line reader ─────────────────────────────────────────────────

/// Accumulates console bytes until CR or LF, then yields the line.
///
/// Backspace and DEL erase the previous byte. A line longer than
/// `MAX_LINE_LEN` is discarded up to its terminator.
pub struct LineReader {
    buf: [u8; MAX_LINE_LEN],
    pos: usize,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; MAX_LINE_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without
    /// terminator) when one is detected. Lines that are not UTF-8 are dropped.
    pub fn feed(&mut self, byte: u8) -> Option<&str> {
        match byte {
            b'\n' | b'\r' => {
                let len = core::mem::take(&mut self.pos);
                if core::mem::take(&mut self.overflowed) {
                    log::warn!("Console line longer than {} bytes dropped", MAX_LINE_LEN);
                    return None;
                }
                if len == 0 {
                    return None;
                }
                core::str::from_utf8(&self.buf[..len]).ok()
            }
            0x08 | 0x7f => {
                self.pos = self.pos.saturating_sub(1);
                None
            }
            _ if self.overflowed => None,
            _ if self.pos < self.buf.len() => {
                self.buf[self.pos] = byte;
                self.pos += 1;
                None
            }
            _ => {
                self.overflowed = true;
                None
            }
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
