//! RGB LED on three active-low pins
//!
//! The Longan Nano's LED is common-anode: a pin driven low lights its
//! channel. Red is on PC13, green on PA1, blue on PA2.

use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin, ToggleableOutputPin};
use void::{ResultVoidExt, Void};

/// The eight colours of a three channel on/off LED
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Color {
    Off,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
}

impl Color {
    /// Colour of the lit channels
    pub fn from_channels(red: bool, green: bool, blue: bool) -> Self {
        match (red, green, blue) {
            (false, false, false) => Color::Off,
            (true, false, false) => Color::Red,
            (false, true, false) => Color::Green,
            (false, false, true) => Color::Blue,
            (true, true, false) => Color::Yellow,
            (false, true, true) => Color::Cyan,
            (true, false, true) => Color::Magenta,
            (true, true, true) => Color::White,
        }
    }

    /// (red, green, blue)
    pub fn channels(self) -> (bool, bool, bool) {
        match self {
            Color::Off => (false, false, false),
            Color::Red => (true, false, false),
            Color::Green => (false, true, false),
            Color::Blue => (false, false, true),
            Color::Yellow => (true, true, false),
            Color::Cyan => (false, true, true),
            Color::Magenta => (true, false, true),
            Color::White => (true, true, true),
        }
    }
}

/// What the LED should show, and whether the rainbow cycle owns it.
///
/// While `rainbow_mode` is set the channel flags mirror the current cycle
/// step rather than anything the user asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedState {
    /// Red channel lit
    pub red: bool,
    /// Green channel lit
    pub green: bool,
    /// Blue channel lit
    pub blue: bool,
    /// The rainbow cycle drives the channels
    pub rainbow_mode: bool,
}

impl LedState {
    /// Colour mixed from the channel flags
    pub fn color(&self) -> Color {
        Color::from_channels(self.red, self.green, self.blue)
    }

    /// Sets the channel flags to `color`
    pub fn set_color(&mut self, color: Color) {
        let (red, green, blue) = color.channels();
        self.red = red;
        self.green = green;
        self.blue = blue;
    }

    /// Leaves rainbow mode, if active, with every channel off. Returns
    /// whether rainbow mode was active.
    pub fn exit_rainbow(&mut self) -> bool {
        let was_active = self.rainbow_mode;
        if was_active {
            self.rainbow_mode = false;
            self.set_color(Color::Off);
        }
        was_active
    }
}

/// Single LED driven by an active-low pin
pub struct Led<P> {
    pin: P,
}

impl<P> Led<P>
where
    P: OutputPin<Error = Void>,
{
    /// Wraps the pin without touching its level
    pub fn new(pin: P) -> Self {
        Led { pin }
    }

    /// Lights the LED (pin low)
    pub fn on(&mut self) {
        self.pin.set_low().void_unwrap();
    }

    /// Darkens the LED (pin high)
    pub fn off(&mut self) {
        self.pin.set_high().void_unwrap();
    }

    /// Lights or darkens the LED
    pub fn set(&mut self, lit: bool) {
        if lit {
            self.on()
        } else {
            self.off()
        }
    }

    /// The underlying pin
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Releases the pin
    pub fn free(self) -> P {
        self.pin
    }
}

impl<P> Led<P>
where
    P: StatefulOutputPin + OutputPin<Error = Void>,
{
    /// Whether the LED is lit, read back from the output latch
    pub fn is_lit(&self) -> bool {
        self.pin.is_set_low().void_unwrap()
    }
}

impl<P> Led<P>
where
    P: ToggleableOutputPin<Error = Void> + OutputPin<Error = Void>,
{
    /// Flips the LED
    pub fn toggle(&mut self) {
        self.pin.toggle().void_unwrap()
    }
}

/// Three LEDs forming one RGB pixel
pub struct RgbLed<R, G, B> {
    /// Red LED
    pub red: Led<R>,
    /// Green LED
    pub green: Led<G>,
    /// Blue LED
    pub blue: Led<B>,
}

impl<R, G, B> RgbLed<R, G, B>
where
    R: OutputPin<Error = Void>,
    G: OutputPin<Error = Void>,
    B: OutputPin<Error = Void>,
{
    /// Takes the three pins and switches every channel off
    pub fn new(red: R, green: G, blue: B) -> Self {
        let mut led = RgbLed {
            red: Led::new(red),
            green: Led::new(green),
            blue: Led::new(blue),
        };
        led.show(Color::Off);
        led
    }

    /// Drives all three pins to show `color`
    pub fn show(&mut self, color: Color) {
        let (red, green, blue) = color.channels();
        self.red.set(red);
        self.green.set(green);
        self.blue.set(blue);
    }

    /// Releases the pins
    pub fn free(self) -> (R, G, B) {
        (self.red.free(), self.green.free(), self.blue.free())
    }
}
