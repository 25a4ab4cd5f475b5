//! # Serial Communication (USART)
//!
//! A polling USART driver written directly against the register map rather
//! than the PAC field accessors. Every register is addressed as
//! `base + offset` through [`RegisterAccess`], and every bit field is a
//! constant mask in the `stat`, `ctl0`, `ctl1`, `ctl2`, `baud` and `data`
//! modules below.
//!
//! Configuration follows the fixed sequence baud rate, word length, stop
//! bits, parity, flow control; the peripheral is enabled afterwards with
//! [`Usart::enable`]. Transmit and receive are gated by status flags and
//! block until the hardware is ready. How long they may block is set by
//! [`Polling`]: the default polls forever, as the bare-metal hardware has no
//! notion of a timeout. The `embedded_hal` writer counts its `WouldBlock`
//! answers against the same budget, so `nb::block!` loops over it end with
//! [`Error::Timeout`] as well.
//!
//! ## Example usage:
//!  ```ignore
//! let p = pac::Peripherals::take().unwrap();
//! let mut rcu = p.RCU.constrain();
//! let clocks = Clocks::irc8m();
//! let mut gpioa = p.GPIOA.split(&mut rcu);
//!
//! // USART0 on Pins A9 and A10
//! let _tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.ctl1);
//! let _rx = gpioa.pa10.into_floating_input(&mut gpioa.ctl1);
//!
//! let mut usart = Usart::new(p.USART0);
//! rcu.enable(Peripheral::Usart0);
//! usart.deinit(&mut rcu);
//! usart.configure(&Config::default().baudrate(115_200.bps()), &clocks);
//! usart.set_transmit_mode(true);
//! usart.set_receive_mode(true);
//! usart.enable();
//!
//! usart.transmit_string("hello\r\n").ok();
//! let received = usart.receive_byte();
//!  ```

use core::fmt;

use crate::clock::Clocks;
use crate::pac::{USART0, USART1, USART2};
use crate::rcu::{ClockControl, Peripheral};
use crate::register::{field, Mmio, Register, RegisterAccess};
use crate::time::{Bps, Hertz, U32Ext};

/// USART instances of the GD32VF103
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartId {
    /// USART0, on APB2
    Usart0,
    /// USART1, on APB1
    Usart1,
    /// USART2, on APB1
    Usart2,
}

impl UsartId {
    /// Base address of the instance's register block
    pub const fn base(self) -> usize {
        match self {
            UsartId::Usart0 => 0x4001_3800,
            UsartId::Usart1 => 0x4000_4400,
            UsartId::Usart2 => 0x4000_4800,
        }
    }

    /// RCU handle for clock gating and reset
    pub const fn peripheral(self) -> Peripheral {
        match self {
            UsartId::Usart0 => Peripheral::Usart0,
            UsartId::Usart1 => Peripheral::Usart1,
            UsartId::Usart2 => Peripheral::Usart2,
        }
    }
}

/// USART register table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartReg {
    /// Status register
    Stat,
    /// Data register
    Data,
    /// Baud rate register
    Baud,
    /// Control register 0
    Ctl0,
    /// Control register 1
    Ctl1,
    /// Control register 2
    Ctl2,
    /// Guard time and prescaler register
    Gp,
}

impl Register for UsartReg {
    fn offset(self) -> usize {
        match self {
            UsartReg::Stat => 0x00,
            UsartReg::Data => 0x04,
            UsartReg::Baud => 0x08,
            UsartReg::Ctl0 => 0x0C,
            UsartReg::Ctl1 => 0x10,
            UsartReg::Ctl2 => 0x14,
            UsartReg::Gp => 0x18,
        }
    }
}

/// USART_STAT bits
pub mod stat {
    use crate::register::bit;

    /// Parity error
    pub const PERR: u32 = bit(0);
    /// Frame error
    pub const FERR: u32 = bit(1);
    /// Noise error
    pub const NERR: u32 = bit(2);
    /// Overrun error
    pub const ORERR: u32 = bit(3);
    /// IDLE frame detected
    pub const IDLEF: u32 = bit(4);
    /// Read data buffer not empty
    pub const RBNE: u32 = bit(5);
    /// Transmission complete
    pub const TC: u32 = bit(6);
    /// Transmit data buffer empty
    pub const TBE: u32 = bit(7);
    /// LIN break detected
    pub const LBDF: u32 = bit(8);
    /// CTS change
    pub const CTSF: u32 = bit(9);
}

/// USART_DATA bits
pub mod data {
    use crate::register::bits;

    /// Transmitted or received data, 9 bits
    pub const DATA: u32 = bits(0, 8);
}

/// USART_BAUD bits
pub mod baud {
    use crate::register::bits;

    /// Fraction part of the baud-rate divider
    pub const FRADIV: u32 = bits(0, 3);
    /// Integer part of the baud-rate divider
    pub const INTDIV: u32 = bits(4, 15);
}

/// USART_CTL0 bits
pub mod ctl0 {
    use crate::register::bit;

    /// Send break command
    pub const SBKCMD: u32 = bit(0);
    /// Receiver wakeup from mute mode
    pub const RWU: u32 = bit(1);
    /// Receiver enable
    pub const REN: u32 = bit(2);
    /// Transmitter enable
    pub const TEN: u32 = bit(3);
    /// IDLE line interrupt enable
    pub const IDLEIE: u32 = bit(4);
    /// Read buffer not empty interrupt enable
    pub const RBNEIE: u32 = bit(5);
    /// Transmission complete interrupt enable
    pub const TCIE: u32 = bit(6);
    /// Transmit buffer empty interrupt enable
    pub const TBEIE: u32 = bit(7);
    /// Parity error interrupt enable
    pub const PERRIE: u32 = bit(8);
    /// Parity mode, set for odd
    pub const PM: u32 = bit(9);
    /// Parity check function enable
    pub const PCEN: u32 = bit(10);
    /// Wakeup method in mute mode
    pub const WM: u32 = bit(11);
    /// Word length, set for 9 bits
    pub const WL: u32 = bit(12);
    /// USART enable
    pub const UEN: u32 = bit(13);
}

/// USART_CTL1 bits
pub mod ctl1 {
    use crate::register::{bit, bits};

    /// Address of the USART in mute mode
    pub const ADDR: u32 = bits(0, 3);
    /// LIN break frame length
    pub const LBLEN: u32 = bit(5);
    /// LIN break detection interrupt enable
    pub const LBDIE: u32 = bit(6);
    /// Clock length of the last bit
    pub const CLEN: u32 = bit(8);
    /// Clock phase
    pub const CPH: u32 = bit(9);
    /// Clock polarity
    pub const CPL: u32 = bit(10);
    /// CK pin enable
    pub const CKEN: u32 = bit(11);
    /// Stop bits length
    pub const STB: u32 = bits(12, 13);
    /// LIN mode enable
    pub const LMEN: u32 = bit(14);
}

/// USART_CTL2 bits
pub mod ctl2 {
    use crate::register::bit;

    /// Error interrupt enable
    pub const ERRIE: u32 = bit(0);
    /// IrDA mode enable
    pub const IREN: u32 = bit(1);
    /// IrDA low-power
    pub const IRLP: u32 = bit(2);
    /// Half-duplex enable
    pub const HDEN: u32 = bit(3);
    /// Smartcard NACK enable
    pub const NKEN: u32 = bit(4);
    /// Smartcard mode enable
    pub const SCEN: u32 = bit(5);
    /// DMA request enable for reception
    pub const DENR: u32 = bit(6);
    /// DMA request enable for transmission
    pub const DENT: u32 = bit(7);
    /// RTS enable
    pub const RTSEN: u32 = bit(8);
    /// CTS enable
    pub const CTSEN: u32 = bit(9);
    /// CTS interrupt enable
    pub const CTSIE: u32 = bit(10);
}

/// Status flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    /// CTS change
    Ctsf,
    /// LIN break detected
    Lbdf,
    /// Transmit data buffer empty
    Tbe,
    /// Transmission complete
    Tc,
    /// Read data buffer not empty
    Rbne,
    /// IDLE frame detected
    Idlef,
    /// Overrun error
    Orerr,
    /// Noise error
    Nerr,
    /// Frame error
    Ferr,
    /// Parity error
    Perr,
}

impl Flag {
    /// Register holding the flag and its mask
    pub const fn location(self) -> (UsartReg, u32) {
        let mask = match self {
            Flag::Ctsf => stat::CTSF,
            Flag::Lbdf => stat::LBDF,
            Flag::Tbe => stat::TBE,
            Flag::Tc => stat::TC,
            Flag::Rbne => stat::RBNE,
            Flag::Idlef => stat::IDLEF,
            Flag::Orerr => stat::ORERR,
            Flag::Nerr => stat::NERR,
            Flag::Ferr => stat::FERR,
            Flag::Perr => stat::PERR,
        };
        (UsartReg::Stat, mask)
    }
}

/// Serial error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// RX buffer overrun
    Overrun,
    /// Parity check error
    Parity,
    /// A flag did not come up within the polling budget
    Timeout,
}

/// Word length. On this peripheral the word includes the parity bit, so
/// 8 data bits plus parity need `Bits9`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordLength {
    /// 8 bits
    Bits8,
    /// 9 bits
    Bits9,
}

/// Parity bit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parity {
    /// No parity
    ParityNone,
    /// Even parity
    ParityEven,
    /// Odd parity
    ParityOdd,
}

/// Stop bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopBits {
    #[doc = "1 stop bit"]
    STOP1,
    #[doc = "0.5 stop bits"]
    STOP0P5,
    #[doc = "2 stop bits"]
    STOP2,
    #[doc = "1.5 stop bits"]
    STOP1P5,
}

/// How long the blocking operations wait for a flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polling {
    /// Spin until the flag is set. A peripheral without clock or a dead
    /// line hangs the caller.
    Forever,
    /// Give up with [`Error::Timeout`] after this many polls
    Bounded(u32),
}

/// What the `embedded_hal` reader does with overrun, noise, frame and
/// parity flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineErrors {
    /// Deliver the received byte regardless
    Ignore,
    /// Report the error and drop the byte
    Report,
}

/// Serial configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Bits per second
    pub baudrate: Bps,
    /// Frame word length, parity bit included
    pub word_length: WordLength,
    /// Parity bit
    pub parity: Parity,
    /// Stop bits
    pub stopbits: StopBits,
    /// RTS/CTS enable. Reserved, nothing in this crate drives the lines.
    pub flow_control: bool,
    /// Wait budget of the blocking and `embedded_hal` operations
    pub polling: Polling,
    /// Receive error policy of the `embedded_hal` reader
    pub line_errors: LineErrors,
}

impl Config {
    /// Sets the baud rate
    pub fn baudrate(mut self, baudrate: Bps) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Sets the word length
    pub fn word_length(mut self, word_length: WordLength) -> Self {
        self.word_length = word_length;
        self
    }

    /// Disables parity
    pub fn parity_none(mut self) -> Self {
        self.parity = Parity::ParityNone;
        self
    }

    /// Sets even parity
    pub fn parity_even(mut self) -> Self {
        self.parity = Parity::ParityEven;
        self
    }

    /// Sets odd parity
    pub fn parity_odd(mut self) -> Self {
        self.parity = Parity::ParityOdd;
        self
    }

    /// Sets the number of stop bits
    pub fn stopbits(mut self, stopbits: StopBits) -> Self {
        self.stopbits = stopbits;
        self
    }

    /// Enables or disables RTS/CTS
    pub fn flow_control(mut self, enabled: bool) -> Self {
        self.flow_control = enabled;
        self
    }

    /// Sets the wait budget
    pub fn polling(mut self, polling: Polling) -> Self {
        self.polling = polling;
        self
    }

    /// Sets the receive error policy
    pub fn line_errors(mut self, line_errors: LineErrors) -> Self {
        self.line_errors = line_errors;
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        let baudrate = 115_200_u32.bps();
        Config {
            baudrate,
            word_length: WordLength::Bits8,
            parity: Parity::ParityNone,
            stopbits: StopBits::STOP1,
            flow_control: false,
            polling: Polling::Forever,
            line_errors: LineErrors::Ignore,
        }
    }
}

/// Baud-rate divider for `clock`, rounded half up
///
/// The result is the 16-bit BAUD value: the upper twelve bits are the
/// integer part of `clock / (16 * baud)` and the low four bits its
/// sixteenths.
pub fn baud_divisor(clock: Hertz, baud: Bps) -> u32 {
    assert!(baud.0 != 0, "impossible baud rate");
    (clock.0 + baud.0 / 2) / baud.0
}

/// USART instances owned through the PAC singletons
pub trait Instance {
    /// Which instance the singleton stands for
    const ID: UsartId;
}

impl Instance for USART0 {
    const ID: UsartId = UsartId::Usart0;
}

impl Instance for USART1 {
    const ID: UsartId = UsartId::Usart1;
}

impl Instance for USART2 {
    const ID: UsartId = UsartId::Usart2;
}

/// Polling USART driver
pub struct Usart<A> {
    regs: A,
    id: UsartId,
    polling: Polling,
    line_errors: LineErrors,
    // consecutive `WouldBlock` answers of the nb writer
    stalled_polls: u32,
}

impl Usart<Mmio<UsartReg>> {
    /// Takes ownership of a USART instance and drives it through its
    /// memory mapped registers
    pub fn new<U: Instance>(_usart: U) -> Self {
        // NOTE(unsafe) the PAC singleton proves exclusive access to the block
        let regs = unsafe { Mmio::new(U::ID.base()) };
        Usart::from_registers(regs, U::ID)
    }
}

impl<A> Usart<A>
where
    A: RegisterAccess<UsartReg>,
{
    /// Wraps an arbitrary register backend
    pub fn from_registers(regs: A, id: UsartId) -> Self {
        let defaults = Config::default();
        Usart {
            regs,
            id,
            polling: defaults.polling,
            line_errors: defaults.line_errors,
            stalled_polls: 0,
        }
    }

    /// Instance this driver was created for
    pub fn id(&self) -> UsartId {
        self.id
    }

    /// Returns the register backend
    pub fn release(self) -> A {
        self.regs
    }

    /// Puts every register back to its reset value by pulsing the RCU reset
    pub fn deinit<C: ClockControl>(&mut self, rcu: &mut C) {
        rcu.reset(self.id.peripheral());
        log::trace!("{:?} reset", self.id);
    }

    /// Applies `config` in the order baud rate, word length, stop bits,
    /// parity, flow control. Call with the transmitter and receiver
    /// disabled.
    pub fn configure(&mut self, config: &Config, clocks: &Clocks) {
        self.set_baudrate(config.baudrate, clocks.usart(self.id));
        self.set_word_length(config.word_length);
        self.set_stop_bits(config.stopbits);
        self.set_parity(config.parity);
        self.set_rts(config.flow_control);
        self.set_cts(config.flow_control);
        self.polling = config.polling;
        self.line_errors = config.line_errors;
        self.stalled_polls = 0;
        log::debug!(
            "{:?} configured: {} bps, {:?}, {:?}, {:?}",
            self.id,
            config.baudrate.0,
            config.word_length,
            config.stopbits,
            config.parity,
        );
    }

    /// Programs the divider for `baud` given the peripheral clock
    pub fn set_baudrate(&mut self, baud: Bps, clock: Hertz) {
        let divisor = baud_divisor(clock, baud);
        assert!(divisor >= 16 && divisor <= 0xFFFF, "impossible baud rate");

        let intdiv = divisor & baud::INTDIV;
        let fradiv = divisor & baud::FRADIV;
        self.regs
            .write(UsartReg::Baud, (baud::INTDIV | baud::FRADIV) & (intdiv | fradiv));
    }

    /// Programs the WL bit
    pub fn set_word_length(&mut self, word_length: WordLength) {
        let wl = match word_length {
            WordLength::Bits8 => 0,
            WordLength::Bits9 => ctl0::WL,
        };
        self.regs.write_field(UsartReg::Ctl0, ctl0::WL, wl);
    }

    /// Programs the STB field
    pub fn set_stop_bits(&mut self, stopbits: StopBits) {
        let stb = match stopbits {
            StopBits::STOP1 => 0b00,
            StopBits::STOP0P5 => 0b01,
            StopBits::STOP2 => 0b10,
            StopBits::STOP1P5 => 0b11,
        };
        self.regs
            .write_field(UsartReg::Ctl1, ctl1::STB, field(stb, 12, 13));
    }

    /// Programs the PM and PCEN bits
    pub fn set_parity(&mut self, parity: Parity) {
        let pm = match parity {
            Parity::ParityNone => 0b00,
            Parity::ParityEven => 0b10,
            Parity::ParityOdd => 0b11,
        };
        self.regs
            .write_field(UsartReg::Ctl0, ctl0::PM | ctl0::PCEN, field(pm, 9, 10));
    }

    /// Hardware RTS flow control
    pub fn set_rts(&mut self, enabled: bool) {
        self.set_flag_bit(UsartReg::Ctl2, ctl2::RTSEN, enabled);
    }

    /// Hardware CTS flow control
    pub fn set_cts(&mut self, enabled: bool) {
        self.set_flag_bit(UsartReg::Ctl2, ctl2::CTSEN, enabled);
    }

    /// Sets UEN. Configure first, the frame format is locked while enabled.
    pub fn enable(&mut self) {
        self.regs.set_bits(UsartReg::Ctl0, ctl0::UEN);
        log::debug!("{:?} enabled", self.id);
    }

    /// Clears UEN
    pub fn disable(&mut self) {
        self.regs.clear_bits(UsartReg::Ctl0, ctl0::UEN);
        log::debug!("{:?} disabled", self.id);
    }

    /// Turns the transmitter on or off
    pub fn set_transmit_mode(&mut self, enabled: bool) {
        self.set_flag_bit(UsartReg::Ctl0, ctl0::TEN, enabled);
    }

    /// Turns the receiver on or off
    pub fn set_receive_mode(&mut self, enabled: bool) {
        self.set_flag_bit(UsartReg::Ctl0, ctl0::REN, enabled);
    }

    fn set_flag_bit(&mut self, reg: UsartReg, mask: u32, enabled: bool) {
        self.regs
            .write_field(reg, mask, if enabled { mask } else { 0 });
    }

    /// Current state of a status flag
    pub fn flag_get(&self, flag: Flag) -> bool {
        let (reg, mask) = flag.location();
        self.regs.is_set(reg, mask)
    }

    /// Polls `flag` until it is set, within the configured budget
    pub fn wait_for(&self, flag: Flag) -> Result<(), Error> {
        match self.polling {
            Polling::Forever => {
                while !self.flag_get(flag) {}
                Ok(())
            }
            Polling::Bounded(polls) => {
                if (0..polls).any(|_| self.flag_get(flag)) {
                    Ok(())
                } else {
                    log::warn!("{:?}: {:?} not set after {} polls", self.id, flag, polls);
                    Err(Error::Timeout)
                }
            }
        }
    }

    /// Sends one byte and returns once it has left the shift register
    pub fn transmit_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.wait_for(Flag::Tbe)?;
        self.regs
            .write(UsartReg::Data, data::DATA & u32::from(byte));
        self.wait_for(Flag::Tc)
    }

    /// Sends every byte in order; nothing is appended
    pub fn transmit_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        bytes.iter().try_for_each(|&b| self.transmit_byte(b))
    }

    /// Sends the UTF-8 bytes of `text`
    pub fn transmit_string(&mut self, text: &str) -> Result<(), Error> {
        self.transmit_bytes(text.as_bytes())
    }

    /// Waits for a byte and returns it. Reading DATA clears RBNE.
    pub fn receive_byte(&mut self) -> Result<u8, Error> {
        self.wait_for(Flag::Rbne)?;
        Ok(self.read_data())
    }

    /// Whether a received byte is waiting, without consuming it
    pub fn data_available(&self) -> bool {
        self.flag_get(Flag::Rbne)
    }

    /// Pending line error, if any, in priority order parity, framing,
    /// noise, overrun
    pub fn line_error(&self) -> Option<Error> {
        let sr = self.regs.read(UsartReg::Stat);
        if sr & stat::PERR != 0 {
            Some(Error::Parity)
        } else if sr & stat::FERR != 0 {
            Some(Error::Framing)
        } else if sr & stat::NERR != 0 {
            Some(Error::Noise)
        } else if sr & stat::ORERR != 0 {
            Some(Error::Overrun)
        } else {
            None
        }
    }

    /// Non-blocking form of [`wait_for`](Self::wait_for). Every `WouldBlock`
    /// counts against the polling budget; once it is spent the wait ends
    /// with [`Error::Timeout`] and the count starts over.
    fn poll_flag(&mut self, flag: Flag) -> nb::Result<(), Error> {
        if self.flag_get(flag) {
            self.stalled_polls = 0;
            return Ok(());
        }
        match self.polling {
            Polling::Forever => Err(nb::Error::WouldBlock),
            Polling::Bounded(polls) => {
                self.stalled_polls = self.stalled_polls.saturating_add(1);
                if self.stalled_polls < polls {
                    Err(nb::Error::WouldBlock)
                } else {
                    self.stalled_polls = 0;
                    log::warn!("{:?}: {:?} not set after {} polls", self.id, flag, polls);
                    Err(nb::Error::Other(Error::Timeout))
                }
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        (self.regs.read(UsartReg::Data) & data::DATA) as u8
    }
}

impl<A> crate::hal::serial::Read<u8> for Usart<A>
where
    A: RegisterAccess<UsartReg>,
{
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        if self.line_errors == LineErrors::Report {
            if let Some(err) = self.line_error() {
                // STAT then DATA read clears the error flags
                let _ = self.regs.read(UsartReg::Stat);
                let _ = self.read_data();
                log::warn!("{:?} line error: {:?}", self.id, err);
                return Err(nb::Error::Other(err));
            }
        }

        if self.data_available() {
            Ok(self.read_data())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<A> crate::hal::serial::Write<u8> for Usart<A>
where
    A: RegisterAccess<UsartReg>,
{
    type Error = Error;

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        self.poll_flag(Flag::Tc)
    }

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.poll_flag(Flag::Tbe)?;
        self.regs
            .write(UsartReg::Data, data::DATA & u32::from(byte));
        Ok(())
    }
}

impl<A> fmt::Write for Usart<A>
where
    A: RegisterAccess<UsartReg>,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.transmit_string(s).map_err(|_| fmt::Error)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{Access, MockUsart};
    use super::*;
    use crate::hal::serial::{Read, Write};
    use crate::rcu::fake::{FakeRcu, Op};
    use crate::register::bit;
    use crate::time::U32Ext;

    fn usart(mock: MockUsart) -> Usart<MockUsart> {
        Usart::from_registers(mock, UsartId::Usart0)
    }

    fn at_96mhz() -> Clocks {
        Clocks::new(96.mhz().into(), 48.mhz().into(), 96.mhz().into())
    }

    #[test]
    fn divisor_rounds_half_up() {
        let f = Hertz(96_000_000);
        assert_eq!(baud_divisor(f, 9_600.bps()), 10_000);
        assert_eq!(baud_divisor(f, 19_200.bps()), 5_000);
        // 833.33
        assert_eq!(baud_divisor(f, 115_200.bps()), 833);
        // 937.5
        assert_eq!(baud_divisor(Hertz(108_000_000), 115_200.bps()), 938);
        // 69.44
        assert_eq!(baud_divisor(Hertz(8_000_000), 115_200.bps()), 69);
    }

    #[test]
    fn baud_register_splits_integer_and_fraction() {
        let clocks = at_96mhz();
        for &(rate, expected) in &[(9_600_u32, 0x2710), (19_200, 0x1388), (115_200, 0x0341)] {
            let mut usart = usart(MockUsart::ready());
            usart.configure(&Config::default().baudrate(rate.bps()), &clocks);
            let regs = usart.release();
            assert_eq!(regs.reg(UsartReg::Baud), expected);
        }

        let mut usart = usart(MockUsart::ready());
        usart.configure(&Config::default(), &at_96mhz());
        let baud = usart.release().reg(UsartReg::Baud);
        assert_eq!((baud & baud::INTDIV) >> 4, 52);
        assert_eq!(baud & baud::FRADIV, 1);
    }

    #[test]
    fn usart1_divisor_uses_apb1() {
        let mut usart = Usart::from_registers(MockUsart::ready(), UsartId::Usart1);
        usart.configure(&Config::default().baudrate(9_600.bps()), &at_96mhz());
        assert_eq!(usart.release().reg(UsartReg::Baud), 5_000);
    }

    #[test]
    #[should_panic(expected = "impossible baud rate")]
    fn rejects_baud_above_clock_range() {
        let mut usart = usart(MockUsart::ready());
        usart.set_baudrate(1_000_000.bps(), Hertz(8_000_000));
    }

    #[test]
    fn frame_format_fields() {
        let mut usart = usart(MockUsart::ready());
        let config = Config::default()
            .word_length(WordLength::Bits9)
            .parity_odd()
            .stopbits(StopBits::STOP2)
            .flow_control(true);
        usart.configure(&config, &at_96mhz());

        // reconfiguring clears the previous fields first
        usart.set_parity(Parity::ParityEven);
        usart.set_stop_bits(StopBits::STOP1P5);

        let regs = usart.release();
        let c0 = regs.reg(UsartReg::Ctl0);
        assert_eq!(c0 & ctl0::WL, ctl0::WL);
        assert_eq!(c0 & (ctl0::PM | ctl0::PCEN), ctl0::PCEN);
        assert_eq!(regs.reg(UsartReg::Ctl1) & ctl1::STB, 0x3000);
        assert_eq!(
            regs.reg(UsartReg::Ctl2) & (ctl2::RTSEN | ctl2::CTSEN),
            ctl2::RTSEN | ctl2::CTSEN
        );
    }

    #[test]
    fn default_frame_is_8n1() {
        let mut usart = usart(MockUsart::ready());
        usart.set_parity(Parity::ParityOdd);
        usart.set_word_length(WordLength::Bits9);
        usart.configure(&Config::default(), &at_96mhz());

        let regs = usart.release();
        assert_eq!(regs.reg(UsartReg::Ctl0) & (ctl0::WL | ctl0::PM | ctl0::PCEN), 0);
        assert_eq!(regs.reg(UsartReg::Ctl1) & ctl1::STB, 0);
        assert_eq!(regs.reg(UsartReg::Ctl2), 0);
    }

    #[test]
    fn enable_and_direction_bits_are_independent() {
        let mut usart = usart(MockUsart::ready());
        usart.set_transmit_mode(true);
        usart.set_receive_mode(true);
        usart.enable();
        usart.set_receive_mode(false);

        let mut regs = usart.release();
        assert_eq!(regs.reg(UsartReg::Ctl0), ctl0::UEN | ctl0::TEN);

        regs.write(UsartReg::Ctl0, ctl0::UEN | ctl0::REN | ctl0::TEN);
        let mut usart = Usart::from_registers(regs, UsartId::Usart0);
        usart.disable();
        assert_eq!(usart.release().reg(UsartReg::Ctl0), ctl0::REN | ctl0::TEN);
    }

    #[test]
    fn deinit_pulses_reset_of_own_instance() {
        let mut rcu = FakeRcu::default();
        let mut usart = Usart::from_registers(MockUsart::ready(), UsartId::Usart2);
        usart.deinit(&mut rcu);
        assert_eq!(rcu.ops, [Op::Reset(Peripheral::Usart2)]);
    }

    #[test]
    fn transmit_waits_for_empty_then_complete() {
        let mut usart = usart(MockUsart::new(2, 3));
        usart.transmit_byte(b'A').unwrap();

        let regs = usart.release();
        let trace = regs.trace.borrow();
        assert_eq!(
            *trace,
            [
                Access::Stat { tbe: false, tc: false },
                Access::Stat { tbe: false, tc: false },
                Access::Stat { tbe: true, tc: false },
                Access::WriteData(u32::from(b'A')),
                Access::Stat { tbe: false, tc: false },
                Access::Stat { tbe: false, tc: false },
                Access::Stat { tbe: true, tc: false },
                Access::Stat { tbe: true, tc: true },
            ]
        );
    }

    #[test]
    fn transmit_string_appends_nothing() {
        let mut usart = usart(MockUsart::new(1, 1));
        usart.transmit_string("ok\r\n").unwrap();
        assert_eq!(usart.release().written(), b"ok\r\n");
    }

    #[test]
    fn bounded_polling_times_out() {
        let mut usart = usart(MockUsart::new(10, 10));
        usart.polling = Polling::Bounded(4);

        assert_eq!(usart.transmit_byte(b'x'), Err(Error::Timeout));
        assert_eq!(usart.receive_byte(), Err(Error::Timeout));
        assert!(usart.release().written().is_empty());
    }

    #[test]
    fn bounded_polling_succeeds_within_budget() {
        let mut usart = usart(MockUsart::new(2, 2));
        usart.configure(&Config::default().polling(Polling::Bounded(3)), &at_96mhz());
        assert_eq!(usart.transmit_byte(b'x'), Ok(()));
    }

    #[test]
    fn receive_consumes_one_byte() {
        let mock = MockUsart::ready();
        mock.receive(b"hi");
        let mut usart = usart(mock);

        assert!(usart.data_available());
        assert_eq!(usart.receive_byte(), Ok(b'h'));
        assert!(usart.data_available());
        assert_eq!(usart.receive_byte(), Ok(b'i'));
        assert!(!usart.data_available());
    }

    #[test]
    fn nb_read_and_write() {
        let mock = MockUsart::ready();
        mock.receive(b"z");
        let mut usart = usart(mock);

        assert_eq!(usart.read(), Ok(b'z'));
        assert_eq!(usart.read(), Err(nb::Error::WouldBlock));

        nb::block!(usart.write(b'q')).unwrap();
        nb::block!(usart.flush()).unwrap();
        assert_eq!(usart.release().written(), b"q");
    }

    #[test]
    fn nb_write_would_block_until_buffer_empty() {
        let mut usart = usart(MockUsart::new(1, 1));
        assert_eq!(usart.write(b'q'), Err(nb::Error::WouldBlock));
        assert_eq!(usart.write(b'q'), Ok(()));
        assert_eq!(usart.flush(), Err(nb::Error::WouldBlock));
        assert_eq!(usart.flush(), Ok(()));
    }

    #[test]
    fn nb_write_honours_polling_budget() {
        let mut usart = usart(MockUsart::new(10, 10));
        usart.configure(&Config::default().polling(Polling::Bounded(3)), &at_96mhz());

        assert_eq!(usart.write(b'q'), Err(nb::Error::WouldBlock));
        assert_eq!(usart.write(b'q'), Err(nb::Error::WouldBlock));
        assert_eq!(usart.write(b'q'), Err(nb::Error::Other(Error::Timeout)));
        // the budget starts over after a timeout
        assert_eq!(usart.write(b'q'), Err(nb::Error::WouldBlock));
        assert_eq!(nb::block!(usart.flush()), Err(Error::Timeout));
        assert!(usart.release().written().is_empty());
    }

    #[test]
    fn nb_write_budget_resets_on_progress() {
        let mut usart = usart(MockUsart::new(2, 3));
        usart.configure(&Config::default().polling(Polling::Bounded(4)), &at_96mhz());

        for &byte in b"abc" {
            nb::block!(usart.write(byte)).unwrap();
            nb::block!(usart.flush()).unwrap();
        }
        assert_eq!(usart.release().written(), b"abc");
    }

    #[test]
    fn line_errors_ignored_by_default() {
        let mock = MockUsart::ready();
        mock.receive(b"k");
        mock.raise(stat::FERR);
        let mut usart = usart(mock);

        assert_eq!(usart.line_error(), Some(Error::Framing));
        assert_eq!(usart.read(), Ok(b'k'));
        assert_eq!(usart.line_error(), None);
    }

    #[test]
    fn line_errors_reported_when_asked() {
        let mock = MockUsart::ready();
        mock.receive(b"kl");
        mock.raise(stat::ORERR | stat::NERR);
        let mut usart = usart(mock);
        usart.configure(&Config::default().line_errors(LineErrors::Report), &at_96mhz());

        assert_eq!(usart.read(), Err(nb::Error::Other(Error::Noise)));
        // the corrupted byte is gone, the next one is clean
        assert_eq!(usart.read(), Ok(b'l'));
    }

    #[test]
    fn formatted_output() {
        use core::fmt::Write as _;

        let mut usart = usart(MockUsart::ready());
        write!(usart, "{}:{}", "led", 1).unwrap();
        assert_eq!(usart.release().written(), b"led:1");
    }

    #[test]
    fn flag_locations() {
        assert_eq!(Flag::Tbe.location(), (UsartReg::Stat, bit(7)));
        assert_eq!(Flag::Rbne.location(), (UsartReg::Stat, bit(5)));
        assert_eq!(Flag::Ctsf.location(), (UsartReg::Stat, bit(9)));
        assert_eq!(UsartId::Usart0.base(), 0x4001_3800);
        assert_eq!(UsartReg::Gp.offset(), 0x18);
    }
}
