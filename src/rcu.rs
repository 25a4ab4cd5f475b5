//! Reset and clock unit
//!
//! Drivers in this crate only need three services from the RCU: gate a
//! peripheral's bus clock on, gate it off, and pulse its reset line.
//! [`ClockControl`] captures exactly that, so drivers can be exercised on the
//! host against a recording fake.

use crate::pac::{rcu, RCU};

/// Extension trait that constrains the `RCU` peripheral
pub trait RcuExt {
    /// Constrains the `RCU` peripheral so it plays nicely with the other abstractions
    fn constrain(self) -> Rcu;
}

impl RcuExt for RCU {
    fn constrain(self) -> Rcu {
        Rcu {
            apb1: APB1 { _0: () },
            apb2: APB2 { _0: () },
        }
    }
}

/// Peripherals whose clock and reset lines are managed here
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Peripheral {
    Afio,
    GpioA,
    GpioB,
    GpioC,
    Usart0,
    Usart1,
    Usart2,
}

/// Clock gating and reset of individual peripherals
pub trait ClockControl {
    /// Turns the peripheral's bus clock on
    fn enable(&mut self, periph: Peripheral);

    /// Turns the peripheral's bus clock off
    fn disable(&mut self, periph: Peripheral);

    /// Asserts then releases the peripheral's reset, returning its registers
    /// to their reset values
    fn reset(&mut self, periph: Peripheral);
}

/// Constrained RCU peripheral
pub struct Rcu {
    /// Advanced Peripheral Bus 1 (APB1) registers
    pub apb1: APB1,
    /// Advanced Peripheral Bus 2 (APB2) registers
    pub apb2: APB2,
}

/// Advanced Peripheral Bus 1 (APB1) registers
pub struct APB1 {
    _0: (),
}

impl APB1 {
    pub(crate) fn en(&mut self) -> &rcu::APB1EN {
        // NOTE(unsafe) this proxy grants exclusive access to this register
        unsafe { &(*RCU::ptr()).apb1en }
    }

    pub(crate) fn rstr(&mut self) -> &rcu::APB1RST {
        // NOTE(unsafe) this proxy grants exclusive access to this register
        unsafe { &(*RCU::ptr()).apb1rst }
    }
}

/// Advanced Peripheral Bus 2 (APB2) registers
pub struct APB2 {
    _0: (),
}

impl APB2 {
    pub(crate) fn en(&mut self) -> &rcu::APB2EN {
        // NOTE(unsafe) this proxy grants exclusive access to this register
        unsafe { &(*RCU::ptr()).apb2en }
    }

    pub(crate) fn rstr(&mut self) -> &rcu::APB2RST {
        // NOTE(unsafe) this proxy grants exclusive access to this register
        unsafe { &(*RCU::ptr()).apb2rst }
    }
}

macro_rules! bus {
    ($($PER:ident => ($apbX:ident, $peren:ident, $perrst:ident),)+) => {
        impl ClockControl for Rcu {
            fn enable(&mut self, periph: Peripheral) {
                match periph {
                    $(
                        Peripheral::$PER => self.$apbX.en().modify(|_, w| w.$peren().set_bit()),
                    )+
                }
            }

            fn disable(&mut self, periph: Peripheral) {
                match periph {
                    $(
                        Peripheral::$PER => self.$apbX.en().modify(|_, w| w.$peren().clear_bit()),
                    )+
                }
            }

            fn reset(&mut self, periph: Peripheral) {
                match periph {
                    $(
                        Peripheral::$PER => {
                            self.$apbX.rstr().modify(|_, w| w.$perrst().set_bit());
                            self.$apbX.rstr().modify(|_, w| w.$perrst().clear_bit());
                        }
                    )+
                }
            }
        }
    }
}

bus! {
    Afio => (apb2, afen, afrst),
    GpioA => (apb2, paen, parst),
    GpioB => (apb2, pben, pbrst),
    GpioC => (apb2, pcen, pcrst),
    Usart0 => (apb2, usart0en, usart0rst),
    Usart1 => (apb1, usart1en, usart1rst),
    Usart2 => (apb1, usart2en, usart2rst),
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{ClockControl, Peripheral};

    /// What happened to which peripheral, in order
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Op {
        Enable(Peripheral),
        Disable(Peripheral),
        Reset(Peripheral),
    }

    #[derive(Default)]
    pub struct FakeRcu {
        pub ops: std::vec::Vec<Op>,
    }

    impl ClockControl for FakeRcu {
        fn enable(&mut self, periph: Peripheral) {
            self.ops.push(Op::Enable(periph));
        }

        fn disable(&mut self, periph: Peripheral) {
            self.ops.push(Op::Disable(periph));
        }

        fn reset(&mut self, periph: Peripheral) {
            self.ops.push(Op::Reset(periph));
        }
    }
}
