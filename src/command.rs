//! Serial command interpreter
//!
//! A command is a `!` followed by a keyword, matched case-insensitively and
//! exactly: no arguments, no surrounding whitespace. [`execute`] applies a
//! command to the LED state and produces the [`Reply`] to send back; it does
//! no I/O itself.

use crate::led::{Color, LedState};
use crate::rainbow::Rainbow;

/// Reminder sent after an unrecognized command
pub const USAGE: &[u8] = b"Valid commands: !red, !green, !blue, !off, !rainbows, !status\r\n";

/// A recognized command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// `!red`: toggle red
    Red,
    /// `!green`: toggle green
    Green,
    /// `!blue`: toggle blue
    Blue,
    /// `!off`: everything off
    Off,
    /// `!rainbows`: start or stop the colour cycle
    Rainbows,
    /// `!status`: report the LED state
    Status,
    /// Anything else
    Unknown,
}

const TABLE: [(&[u8], Command); 6] = [
    (b"!red", Command::Red),
    (b"!green", Command::Green),
    (b"!blue", Command::Blue),
    (b"!off", Command::Off),
    (b"!rainbows", Command::Rainbows),
    (b"!status", Command::Status),
];

impl Command {
    /// Lower-cases `line` in place, then looks it up
    pub fn parse(line: &mut [u8]) -> Command {
        line.make_ascii_lowercase();
        TABLE
            .iter()
            .find(|(keyword, _)| compare(line, keyword) == 0)
            .map_or(Command::Unknown, |&(_, command)| command)
    }
}

/// C-style comparison: the difference of the first pair of bytes that
/// differ, with the end of a slice reading as NUL
pub fn compare(a: &[u8], b: &[u8]) -> i32 {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            i32::from(x) - i32::from(y)
        })
        .find(|&d| d != 0)
        .unwrap_or(0)
}

/// One colour of the RGB LED
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    #[allow(missing_docs)]
    Red,
    #[allow(missing_docs)]
    Green,
    #[allow(missing_docs)]
    Blue,
}

impl Channel {
    fn label(self) -> &'static [u8] {
        match self {
            Channel::Red => b"Red",
            Channel::Green => b"Green",
            Channel::Blue => b"Blue",
        }
    }
}

/// Response to a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// A channel was toggled to the given state
    Toggled(Channel, bool),
    /// Every channel was switched off
    AllOff,
    /// Rainbow mode started
    RainbowOn,
    /// Rainbow mode stopped
    RainbowOff,
    /// Status request while the cycle owns the LED
    RainbowActive,
    /// Status request: each channel's state
    #[allow(missing_docs)]
    Status { red: bool, green: bool, blue: bool },
    /// The line matched no command
    Unknown,
}

fn on_off(lit: bool) -> &'static [u8] {
    if lit {
        b"ON\r\n"
    } else {
        b"OFF\r\n"
    }
}

impl Reply {
    /// Emits the reply text piece by piece. `line` is the command as
    /// received, echoed back by [`Reply::Unknown`].
    pub fn render<E, F>(&self, line: &[u8], mut emit: F) -> Result<(), E>
    where
        F: FnMut(&[u8]) -> Result<(), E>,
    {
        match *self {
            Reply::Toggled(channel, lit) => {
                emit(channel.label())?;
                emit(b" LED: ")?;
                emit(on_off(lit))
            }
            Reply::AllOff => emit(b"All LEDs OFF\r\n"),
            Reply::RainbowOn => emit(b"Rainbow mode ON ~*~\r\n"),
            Reply::RainbowOff => emit(b"Rainbow mode OFF ~*~\r\n"),
            Reply::RainbowActive => emit(b"Status: rainbow mode active\r\n"),
            Reply::Status { red, green, blue } => {
                for &(channel, lit) in &[
                    (Channel::Red, red),
                    (Channel::Green, green),
                    (Channel::Blue, blue),
                ] {
                    emit(channel.label())?;
                    emit(b": ")?;
                    emit(on_off(lit))?;
                }
                Ok(())
            }
            Reply::Unknown => {
                emit(b"Unknown command: ")?;
                emit(line)?;
                emit(b"\r\n")?;
                emit(USAGE)
            }
        }
    }
}

/// Applies `command` to the LED state.
///
/// Manual colour commands and `!off` end rainbow mode first, so a colour
/// toggled out of the rainbow always starts from all channels off.
pub fn execute(command: Command, state: &mut LedState, rainbow: &mut Rainbow) -> Reply {
    log::debug!("command {:?}", command);
    match command {
        Command::Red => {
            state.exit_rainbow();
            state.red = !state.red;
            Reply::Toggled(Channel::Red, state.red)
        }
        Command::Green => {
            state.exit_rainbow();
            state.green = !state.green;
            Reply::Toggled(Channel::Green, state.green)
        }
        Command::Blue => {
            state.exit_rainbow();
            state.blue = !state.blue;
            Reply::Toggled(Channel::Blue, state.blue)
        }
        Command::Off => {
            state.exit_rainbow();
            state.set_color(Color::Off);
            Reply::AllOff
        }
        Command::Rainbows => {
            if state.exit_rainbow() {
                Reply::RainbowOff
            } else {
                state.rainbow_mode = true;
                state.set_color(rainbow.start());
                Reply::RainbowOn
            }
        }
        Command::Status => {
            if state.rainbow_mode {
                Reply::RainbowActive
            } else {
                Reply::Status {
                    red: state.red,
                    green: state.green,
                    blue: state.blue,
                }
            }
        }
        Command::Unknown => Reply::Unknown,
    }
}
