//! Serial LED console
//!
//! [`Console`] owns everything the main loop touches: the serial port, the
//! LED pins, the LED state, the line buffer and the rainbow cycle. Calling
//! [`Console::poll`] once per loop iteration runs the whole program:
//!
//! 1. advance the rainbow cycle when it is active;
//! 2. take at most one received byte, echo it, and either buffer it or, on
//!    `\r`, execute the buffered line.
//!
//! All output blocks until each byte has left the transmitter.

use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial::{Read, Write};
use void::Void;

use crate::buffer::CommandBuffer;
use crate::command::{self, Command, USAGE};
use crate::led::{LedState, RgbLed};
use crate::rainbow::{Rainbow, DEFAULT_INTERVAL};

const BANNER: &[u8] = b"=== GD32VF103 LED console ===\r\n";
const OVERFLOW: &[u8] = b"\r\nError: command too long (max 49 characters), discarded\r\n";

/// Console settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Loop iterations per rainbow step
    pub rainbow_interval: u32,
}

impl Config {
    /// Sets the loop iterations per rainbow step
    pub fn rainbow_interval(mut self, iterations: u32) -> Self {
        self.rainbow_interval = iterations;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rainbow_interval: DEFAULT_INTERVAL,
        }
    }
}

/// The LED console: serial port, LEDs and interpreter state
pub struct Console<S, R, G, B> {
    serial: S,
    leds: RgbLed<R, G, B>,
    state: LedState,
    buffer: CommandBuffer,
    rainbow: Rainbow,
}

/// Sends `bytes`, waiting for the buffer to empty before each byte and for
/// the transmission to complete after it. How long the waits may take is up
/// to the port; [`Usart`](crate::serial::Usart) bounds them by its
/// [`Polling`](crate::serial::Polling) setting.
fn transmit<S, E>(serial: &mut S, bytes: &[u8]) -> Result<(), E>
where
    S: Write<u8, Error = E>,
{
    for &byte in bytes {
        nb::block!(serial.write(byte))?;
        nb::block!(serial.flush())?;
    }
    Ok(())
}

impl<S, E, R, G, B> Console<S, R, G, B>
where
    S: Read<u8, Error = E> + Write<u8, Error = E>,
    R: OutputPin<Error = Void>,
    G: OutputPin<Error = Void>,
    B: OutputPin<Error = Void>,
{
    /// Takes a configured serial port and the LEDs. Nothing is sent until
    /// [`greet`](Self::greet) or the first received byte.
    pub fn new(serial: S, leds: RgbLed<R, G, B>, config: Config) -> Self {
        Console {
            serial,
            leds,
            state: LedState::default(),
            buffer: CommandBuffer::new(),
            rainbow: Rainbow::new(config.rainbow_interval),
        }
    }

    /// Prints the banner and the command list
    pub fn greet(&mut self) -> Result<(), E> {
        transmit(&mut self.serial, BANNER)?;
        transmit(&mut self.serial, USAGE)
    }

    /// One main-loop iteration
    pub fn poll(&mut self) -> Result<(), E> {
        if self.state.rainbow_mode {
            if let Some(color) = self.rainbow.tick() {
                self.state.set_color(color);
                self.leds.show(color);
            }
        }

        match self.serial.read() {
            Ok(byte) => self.feed(byte),
            Err(nb::Error::WouldBlock) => Ok(()),
            Err(nb::Error::Other(e)) => Err(e),
        }
    }

    /// Handles one received byte
    pub fn feed(&mut self, byte: u8) -> Result<(), E> {
        transmit(&mut self.serial, &[byte])?;

        if byte == b'\r' {
            transmit(&mut self.serial, b"\n")?;
            if self.buffer.is_empty() {
                return Ok(());
            }
            let result = self.dispatch();
            self.buffer.clear();
            return result;
        }

        if self.buffer.push(byte).is_err() {
            log::warn!("line longer than {} bytes dropped", crate::buffer::MAX_LINE);
            self.buffer.clear();
            transmit(&mut self.serial, OVERFLOW)?;
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Result<(), E> {
        let Console {
            serial,
            leds,
            state,
            buffer,
            rainbow,
        } = self;

        let line = buffer.terminate_and_take();
        let command = Command::parse(line);
        let reply = command::execute(command, state, rainbow);
        leds.show(state.color());

        reply.render(line, |bytes| transmit(serial, bytes))
    }

    /// What the LEDs show
    pub fn state(&self) -> &LedState {
        &self.state
    }

    /// The LED pins
    pub fn leds(&self) -> &RgbLed<R, G, B> {
        &self.leds
    }

    /// The rainbow cycle position
    pub fn rainbow(&self) -> &Rainbow {
        &self.rainbow
    }

    /// Bytes of the line received so far
    pub fn pending(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Gives back the serial port and the pins
    pub fn free(self) -> (S, (R, G, B)) {
        (self.serial, self.leds.free())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::vec::Vec;

    use super::*;
    use crate::led::mock::MockPin;
    use crate::led::Color;

    /// Loopback-free serial port: scripted input, recorded output
    #[derive(Default)]
    struct MockSerial {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        flushes: usize,
        fail_rx: bool,
    }

    impl Read<u8> for MockSerial {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, ()> {
            if self.fail_rx {
                return Err(nb::Error::Other(()));
            }
            self.rx.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl Write<u8> for MockSerial {
        type Error = ();

        fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
            self.tx.push(byte);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), ()> {
            self.flushes += 1;
            Ok(())
        }
    }

    type TestConsole = Console<MockSerial, MockPin, MockPin, MockPin>;

    fn console(interval: u32) -> TestConsole {
        let leds = RgbLed::new(MockPin::default(), MockPin::default(), MockPin::default());
        Console::new(
            MockSerial::default(),
            leds,
            Config::default().rainbow_interval(interval),
        )
    }

    fn type_line(console: &mut TestConsole, text: &[u8]) -> Vec<u8> {
        console.serial.tx.clear();
        for &b in text {
            console.feed(b).unwrap();
        }
        core::mem::take(&mut console.serial.tx)
    }

    /// Pin levels as (red, green, blue), true meaning driven high
    fn levels(console: &TestConsole) -> (bool, bool, bool) {
        let level = |high: Option<bool>| high.unwrap();
        (
            level(console.leds.red.pin().high),
            level(console.leds.green.pin().high),
            level(console.leds.blue.pin().high),
        )
    }

    #[test]
    fn echoes_and_answers() {
        let mut console = console(DEFAULT_INTERVAL);
        let out = type_line(&mut console, b"!Red\r");
        assert_eq!(out, b"!Red\r\nRed LED: ON\r\n");
        assert!(console.state().red);
        assert_eq!(levels(&console), (false, true, true));
    }

    #[test]
    fn every_byte_waits_for_completion() {
        let mut console = console(DEFAULT_INTERVAL);
        type_line(&mut console, b"!off\r");
        assert_eq!(console.serial.flushes, b"!off\r\nAll LEDs OFF\r\n".len());
    }

    #[test]
    fn mixed_case_is_the_same_command() {
        for text in &[&b"!RED\r"[..], b"!Red\r", b"!rEd\r", b"!red\r"] {
            let mut console = console(DEFAULT_INTERVAL);
            type_line(&mut console, text);
            assert_eq!(*console.state(), LedState { red: true, ..LedState::default() });
            assert_eq!(levels(&console), (false, true, true));
        }
    }

    #[test]
    fn double_toggle_restores_pin() {
        let mut console = console(DEFAULT_INTERVAL);
        type_line(&mut console, b"!blue\r");
        assert_eq!(levels(&console), (true, true, false));
        let out = type_line(&mut console, b"!blue\r");
        assert!(out.ends_with(b"Blue LED: OFF\r\n"));
        assert_eq!(levels(&console), (true, true, true));
        assert_eq!(*console.state(), LedState::default());
    }

    #[test]
    fn bare_return_is_not_dispatched() {
        let mut console = console(DEFAULT_INTERVAL);
        assert_eq!(type_line(&mut console, b"\r"), b"\r\n");
        assert_eq!(type_line(&mut console, b"\r\r"), b"\r\n\r\n");
        assert_eq!(*console.state(), LedState::default());
    }

    #[test]
    fn unknown_command_is_echoed_lowercased() {
        let mut console = console(DEFAULT_INTERVAL);
        let out = type_line(&mut console, b"!Purple\r");
        let expected: &[u8] = b"!Purple\r\n\
            Unknown command: !purple\r\n\
            Valid commands: !red, !green, !blue, !off, !rainbows, !status\r\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn trailing_space_is_unknown() {
        let mut console = console(DEFAULT_INTERVAL);
        let out = type_line(&mut console, b"!red \r");
        assert!(out.starts_with(b"!red \r\nUnknown command: !red \r\n"));
        assert!(!console.state().red);
    }

    #[test]
    fn newline_is_an_ordinary_byte() {
        let mut console = console(DEFAULT_INTERVAL);
        type_line(&mut console, b"\n!red");
        assert_eq!(console.pending(), b"\n!red");
        let out = type_line(&mut console, b"\r");
        assert!(out.starts_with(b"\r\nUnknown command: \n!red"));
    }

    #[test]
    fn overflow_discards_line_once() {
        let mut console = console(DEFAULT_INTERVAL);
        let long = [b'a'; 49];
        let out = type_line(&mut console, &long);
        assert_eq!(out, &long[..]);
        assert_eq!(console.pending().len(), 49);

        let out = type_line(&mut console, b"b");
        assert_eq!(out, [&b"b"[..], OVERFLOW].concat());
        assert!(console.pending().is_empty());

        // the following bytes start a fresh line
        let out = type_line(&mut console, b"!green\r");
        assert!(out.ends_with(b"Green LED: ON\r\n"));
        assert!(console.state().green);
    }

    #[test]
    fn rainbow_runs_from_poll_and_yields_to_manual_color() {
        let mut console = console(2);
        console.serial.rx.extend(b"!rainbows\r".iter());
        while !console.serial.rx.is_empty() {
            console.poll().unwrap();
        }
        assert!(console.serial.tx.ends_with(b"Rainbow mode ON ~*~\r\n"));
        assert_eq!(console.state().color(), Color::Red);
        assert_eq!(levels(&console), (false, true, true));

        // two idle iterations per step
        console.poll().unwrap();
        console.poll().unwrap();
        assert_eq!(console.state().color(), Color::Yellow);
        assert_eq!(levels(&console), (false, false, true));

        let out = type_line(&mut console, b"!green\r");
        assert!(out.ends_with(b"Green LED: ON\r\n"));
        assert_eq!(
            *console.state(),
            LedState { green: true, ..LedState::default() }
        );
        assert_eq!(levels(&console), (true, false, true));

        // the cycle no longer moves the pins
        for _ in 0..10 {
            console.poll().unwrap();
        }
        assert_eq!(levels(&console), (true, false, true));
    }

    #[test]
    fn leaving_rainbow_turns_everything_off() {
        let mut console = console(1);
        type_line(&mut console, b"!rainbows\r");
        console.poll().unwrap();
        let out = type_line(&mut console, b"!RAINBOWS\r");
        assert!(out.ends_with(b"Rainbow mode OFF ~*~\r\n"));
        assert_eq!(*console.state(), LedState::default());
        assert_eq!(levels(&console), (true, true, true));
    }

    #[test]
    fn status_in_rainbow_mode() {
        let mut console = console(DEFAULT_INTERVAL);
        type_line(&mut console, b"!rainbows\r");
        let out = type_line(&mut console, b"!status\r");
        assert!(out.ends_with(b"Status: rainbow mode active\r\n"));
    }

    #[test]
    fn greeting_lists_commands() {
        let mut console = console(DEFAULT_INTERVAL);
        console.greet().unwrap();
        let (serial, _) = console.free();
        assert!(serial.tx.starts_with(BANNER));
        assert!(serial.tx.ends_with(USAGE));
    }

    mod over_usart {
        use crate::clock::Clocks;
        use crate::console::{Config, Console};
        use crate::led::mock::MockPin;
        use crate::led::RgbLed;
        use crate::serial::mock::MockUsart;
        use crate::serial::{self, Polling, Usart, UsartId};

        type UsartConsole = Console<Usart<MockUsart>, MockPin, MockPin, MockPin>;

        fn console(mock: MockUsart, polling: Polling) -> UsartConsole {
            let mut usart = Usart::from_registers(mock, UsartId::Usart0);
            let config = serial::Config::default().polling(polling);
            usart.configure(&config, &Clocks::irc8m());
            let leds = RgbLed::new(MockPin::default(), MockPin::default(), MockPin::default());
            Console::new(usart, leds, Config::default())
        }

        #[test]
        fn stalled_transmitter_times_out() {
            let mut console = console(MockUsart::new(1_000, 1_000), Polling::Bounded(4));
            assert_eq!(console.greet(), Err(serial::Error::Timeout));

            let (usart, _) = console.free();
            assert!(usart.release().written().is_empty());
        }

        #[test]
        fn slow_transmitter_within_budget() {
            let mock = MockUsart::new(1, 2);
            mock.receive(b"!red\r");
            let mut console = console(mock, Polling::Bounded(4));
            for _ in 0..5 {
                console.poll().unwrap();
            }
            assert!(console.state().red);

            let (usart, _) = console.free();
            assert_eq!(usart.release().written(), b"!red\r\nRed LED: ON\r\n");
        }
    }

    #[test]
    fn receive_errors_surface_from_poll() {
        let mut console = console(DEFAULT_INTERVAL);
        console.serial.fail_rx = true;
        assert_eq!(console.poll(), Err(()));
    }
}
