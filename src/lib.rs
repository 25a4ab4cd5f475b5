//! DIY drivers and a serial LED console for the GD32VF103
//!
//! The USART driver talks to the peripheral registers directly through
//! [`register::Mmio`] instead of the PAC's register API. GPIO and RCU setup
//! still go through [`pac`].
//!
//! On top of the drivers, [`console::Console`] implements a line-based
//! command interpreter that drives the board's RGB LED.

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

pub use gd32vf103_pac as pac;

use embedded_hal as hal;

pub mod buffer;
pub mod clock;
pub mod command;
pub mod console;
pub mod delay;
pub mod gpio;
pub mod led;
pub mod rainbow;
pub mod rcu;
pub mod register;
pub mod serial;
pub mod time;

/// Extension traits, imported anonymously
pub mod prelude {
    pub use crate::gpio::GpioExt as _gd32vf103_diy_gpio_GpioExt;
    pub use crate::hal::prelude::*;
    pub use crate::rcu::ClockControl as _gd32vf103_diy_rcu_ClockControl;
    pub use crate::rcu::RcuExt as _gd32vf103_diy_rcu_RcuExt;
    pub use crate::time::U32Ext as _gd32vf103_diy_time_U32Ext;
}
