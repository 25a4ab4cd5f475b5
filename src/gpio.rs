//! General purpose I/O
//!
//! Only what the LED and USART programs need: push-pull outputs, alternate
//! function push-pull outputs and floating inputs, as type states.

use core::marker::PhantomData;

use crate::rcu::ClockControl;

/// Extension trait to split a GPIO peripheral in independent pins and registers
pub trait GpioExt {
    /// The to split the GPIO into
    type Parts;

    /// Enables and resets the port, then splits it into independent pins
    fn split<C: ClockControl>(self, rcu: &mut C) -> Self::Parts;
}

/// Input mode (type state)
pub struct Input<MODE> {
    _mode: PhantomData<MODE>,
}

/// Floating Input
pub struct Floating;

/// Output mode (type state)
pub struct Output<MODE> {
    _mode: PhantomData<MODE>,
}

/// Totem Pole aka Push-Pull
pub struct PushPull;

/// Alternate function
pub struct Alternate<MODE> {
    _mode: PhantomData<MODE>,
}

/// Initial output level
pub enum State {
    /// High
    High,
    /// Low
    Low,
}

// CTL nibble layout: CTL[1:0] << 2 | MD[1:0]
const PUSH_PULL_OUTPUT_2MHZ: u32 = 0b0010;
const ALTERNATE_PUSH_PULL_50MHZ: u32 = 0b1011;
const FLOATING_INPUT: u32 = 0b0100;

/// Port registers addressed by offset, for driving pins through
/// [`Mmio`](crate::register::Mmio) without the type states
pub mod raw {
    use crate::register::{bit, bits, Register, RegisterAccess};

    /// GPIOA base address
    pub const GPIOA: usize = 0x4001_0800;
    /// GPIOB base address
    pub const GPIOB: usize = 0x4001_0C00;
    /// GPIOC base address
    pub const GPIOC: usize = 0x4001_1000;

    /// Push-pull output, 2 MHz
    pub const PUSH_PULL_OUTPUT: u32 = super::PUSH_PULL_OUTPUT_2MHZ;
    /// Alternate function push-pull output, 50 MHz
    pub const ALTERNATE_PUSH_PULL: u32 = super::ALTERNATE_PUSH_PULL_50MHZ;
    /// Floating input, the reset mode of every pin
    pub const FLOATING_INPUT: u32 = super::FLOATING_INPUT;

    /// GPIO port register table
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum GpioReg {
        /// Mode of pins 0..=7
        Ctl0,
        /// Mode of pins 8..=15
        Ctl1,
        /// Input levels
        Istat,
        /// Output latch
        Octl,
        /// Bit operate: set in the low half, clear in the high half
        Bop,
        /// Bit clear
        Bc,
        /// Configuration lock
        Lock,
    }

    impl Register for GpioReg {
        fn offset(self) -> usize {
            match self {
                GpioReg::Ctl0 => 0x00,
                GpioReg::Ctl1 => 0x04,
                GpioReg::Istat => 0x08,
                GpioReg::Octl => 0x0C,
                GpioReg::Bop => 0x10,
                GpioReg::Bc => 0x14,
                GpioReg::Lock => 0x18,
            }
        }
    }

    /// Register and mask of the mode nibble of `pin`
    pub const fn mode_field(pin: u32) -> (GpioReg, u32) {
        let shift = 4 * (pin % 8);
        let reg = if pin < 8 { GpioReg::Ctl0 } else { GpioReg::Ctl1 };
        (reg, bits(shift, shift + 3))
    }

    /// BOP value driving `pin` to the given level
    pub const fn bop(pin: u32, high: bool) -> u32 {
        if high {
            bit(pin)
        } else {
            bit(pin + 16)
        }
    }

    /// Writes the mode nibble of `pin`, leaving the other pins alone
    pub fn set_mode<A: RegisterAccess<GpioReg>>(port: &mut A, pin: u32, mode: u32) {
        let (reg, mask) = mode_field(pin);
        port.write_field(reg, mask, mode << (4 * (pin % 8)));
    }

    /// Drives `pin` high or low with a single BOP write
    pub fn set_level<A: RegisterAccess<GpioReg>>(port: &mut A, pin: u32, high: bool) {
        port.write(GpioReg::Bop, bop(pin, high));
    }
}

macro_rules! gpio {
    ($GPIOX:ident, $gpiox:ident, $periph:ident, [
        $($PXi:ident: ($pxi:ident, $i:expr, $CTL:ident),)+
    ]) => {
        /// GPIO
        pub mod $gpiox {
            use void::{ResultVoidExt, Void};
            use core::marker::PhantomData;
            use crate::hal::digital::v2::{OutputPin, StatefulOutputPin, toggleable};
            use crate::pac::{gpioa, $GPIOX};
            use crate::rcu::{ClockControl, Peripheral};
            use super::{
                Alternate, Floating, GpioExt, Input, Output, PushPull, State,
                ALTERNATE_PUSH_PULL_50MHZ, FLOATING_INPUT, PUSH_PULL_OUTPUT_2MHZ,
            };

            /// GPIO parts
            pub struct Parts {
                /// Opaque CTL0 register
                pub ctl0: CTL0,
                /// Opaque CTL1 register
                pub ctl1: CTL1,
                $(
                    /// Pin
                    pub $pxi: $PXi<Input<Floating>>,
                )+
            }

            impl GpioExt for $GPIOX {
                type Parts = Parts;

                fn split<C: ClockControl>(self, rcu: &mut C) -> Parts {
                    rcu.enable(Peripheral::$periph);
                    rcu.reset(Peripheral::$periph);

                    Parts {
                        ctl0: CTL0 { _0: () },
                        ctl1: CTL1 { _0: () },
                        $(
                            $pxi: $PXi { _mode: PhantomData },
                        )+
                    }
                }
            }

            /// Opaque CTL0 register (pins 0..=7)
            pub struct CTL0 {
                _0: (),
            }

            impl CTL0 {
                #[allow(dead_code)]
                pub(crate) fn ctl(&mut self) -> &gpioa::CTL0 {
                    unsafe { &(*$GPIOX::ptr()).ctl0 }
                }
            }

            /// Opaque CTL1 register (pins 8..=15)
            pub struct CTL1 {
                _0: (),
            }

            impl CTL1 {
                #[allow(dead_code)]
                pub(crate) fn ctl(&mut self) -> &gpioa::CTL1 {
                    unsafe { &(*$GPIOX::ptr()).ctl1 }
                }
            }

            $(
                /// Pin
                pub struct $PXi<MODE> {
                    _mode: PhantomData<MODE>,
                }

                impl<MODE> $PXi<MODE> {
                    const OFFSET: u32 = (4 * $i) % 32;

                    fn set_ctl(ctl: &mut $CTL, bits: u32) {
                        ctl
                            .ctl()
                            .modify(|r, w| unsafe {
                                w.bits((r.bits() & !(0b1111 << Self::OFFSET)) | (bits << Self::OFFSET))
                            });
                    }

                    /// Configures the pin to operate as an alternate function push-pull output
                    /// pin.
                    pub fn into_alternate_push_pull(
                        self,
                        ctl: &mut $CTL,
                    ) -> $PXi<Alternate<PushPull>> {
                        Self::set_ctl(ctl, ALTERNATE_PUSH_PULL_50MHZ);
                        $PXi { _mode: PhantomData }
                    }

                    /// Configures the pin to operate as a floating input pin
                    pub fn into_floating_input(
                        self,
                        ctl: &mut $CTL,
                    ) -> $PXi<Input<Floating>> {
                        Self::set_ctl(ctl, FLOATING_INPUT);
                        $PXi { _mode: PhantomData }
                    }

                    /// Configures the pin to operate as a push-pull output pin.
                    /// Initial state will be low.
                    pub fn into_push_pull_output(
                        self,
                        ctl: &mut $CTL,
                    ) -> $PXi<Output<PushPull>> {
                        self.into_push_pull_output_with_state(ctl, State::Low)
                    }

                    /// Configures the pin to operate as a push-pull output pin.
                    /// The output latch is written before the mode switch so the pin
                    /// never glitches to the other level.
                    pub fn into_push_pull_output_with_state(
                        self,
                        ctl: &mut $CTL,
                        initial_state: State,
                    ) -> $PXi<Output<PushPull>> {
                        let mut res = $PXi { _mode: PhantomData };

                        match initial_state {
                            State::High => res.set_high(),
                            State::Low  => res.set_low(),
                        }.void_unwrap();

                        Self::set_ctl(ctl, PUSH_PULL_OUTPUT_2MHZ);
                        res
                    }
                }

                impl<MODE> OutputPin for $PXi<Output<MODE>> {
                    type Error = Void;

                    fn set_high(&mut self) -> Result<(), Self::Error> {
                        // NOTE(unsafe) atomic write to a stateless register
                        Ok(unsafe { (*$GPIOX::ptr()).bop.write(|w| w.bits(1 << $i)) })
                    }

                    fn set_low(&mut self) -> Result<(), Self::Error> {
                        // NOTE(unsafe) atomic write to a stateless register
                        Ok(unsafe { (*$GPIOX::ptr()).bop.write(|w| w.bits(1 << (16 + $i))) })
                    }
                }

                impl<MODE> StatefulOutputPin for $PXi<Output<MODE>> {
                    fn is_set_high(&self) -> Result<bool, Self::Error> {
                        self.is_set_low().map(|b| !b)
                    }

                    fn is_set_low(&self) -> Result<bool, Self::Error> {
                        // NOTE(unsafe) atomic read with no side effects
                        Ok(unsafe { (*$GPIOX::ptr()).octl.read().bits() & (1 << $i) == 0 })
                    }
                }

                impl<MODE> toggleable::Default for $PXi<Output<MODE>> {}
            )+
        }
    }
}

gpio!(GPIOA, gpioa, GpioA, [
    PA0: (pa0, 0, CTL0),
    PA1: (pa1, 1, CTL0),
    PA2: (pa2, 2, CTL0),
    PA3: (pa3, 3, CTL0),
    PA4: (pa4, 4, CTL0),
    PA5: (pa5, 5, CTL0),
    PA6: (pa6, 6, CTL0),
    PA7: (pa7, 7, CTL0),
    PA8: (pa8, 8, CTL1),
    PA9: (pa9, 9, CTL1),
    PA10: (pa10, 10, CTL1),
    PA11: (pa11, 11, CTL1),
    PA12: (pa12, 12, CTL1),
]);

gpio!(GPIOB, gpiob, GpioB, [
    PB0: (pb0, 0, CTL0),
    PB1: (pb1, 1, CTL0),
    PB5: (pb5, 5, CTL0),
    PB6: (pb6, 6, CTL0),
    PB7: (pb7, 7, CTL0),
    PB8: (pb8, 8, CTL1),
    PB9: (pb9, 9, CTL1),
    PB10: (pb10, 10, CTL1),
    PB11: (pb11, 11, CTL1),
    PB12: (pb12, 12, CTL1),
    PB13: (pb13, 13, CTL1),
    PB14: (pb14, 14, CTL1),
    PB15: (pb15, 15, CTL1),
]);

gpio!(GPIOC, gpioc, GpioC, [
    PC13: (pc13, 13, CTL1),
    PC14: (pc14, 14, CTL1),
    PC15: (pc15, 15, CTL1),
]);

#[cfg(test)]
mod tests {
    use super::raw::*;
    use crate::register::{Mmio, Register, RegisterAccess};

    #[test]
    fn mode_nibbles_and_bop_values() {
        assert_eq!(mode_field(0), (GpioReg::Ctl0, 0x0000_000F));
        assert_eq!(mode_field(9), (GpioReg::Ctl1, 0x0000_00F0));
        assert_eq!(mode_field(15), (GpioReg::Ctl1, 0xF000_0000));
        assert_eq!(bop(2, true), 0x0000_0004);
        assert_eq!(bop(2, false), 0x0004_0000);
        assert_eq!(GpioReg::Bop.offset(), 0x10);
    }

    #[test]
    fn raw_port_over_ram() {
        // reset value: every pin a floating input
        let mut words = [0u32; 7];
        words[0] = 0x4444_4444;
        words[1] = 0x4444_4444;
        let mut port: Mmio<GpioReg> = unsafe { Mmio::new(words.as_mut_ptr() as usize) };

        set_mode(&mut port, 13, PUSH_PULL_OUTPUT);
        set_mode(&mut port, 1, PUSH_PULL_OUTPUT);
        set_mode(&mut port, 9, ALTERNATE_PUSH_PULL);
        set_level(&mut port, 13, false);

        assert_eq!(port.read(GpioReg::Ctl0), 0x4444_4424);
        assert_eq!(port.read(GpioReg::Ctl1), 0x4424_44B4);
        assert_eq!(port.read(GpioReg::Bop), 1 << 29);
    }
}
