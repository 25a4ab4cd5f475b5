//! Frozen clock tree
//!
//! Clock setup itself (PLL, prescalers) happens before any driver in this
//! crate runs. `Clocks` records the resulting bus frequencies so drivers can
//! derive dividers from them.

use crate::serial::UsartId;
use crate::time::{Hertz, U32Ext};

/// Bus frequencies in effect
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clocks {
    sysclk: Hertz,
    apb1: Hertz,
    apb2: Hertz,
}

impl Clocks {
    /// Frequencies after reset: everything runs from the 8 MHz IRC8M
    pub fn irc8m() -> Self {
        Clocks {
            sysclk: 8.mhz().into(),
            apb1: 8.mhz().into(),
            apb2: 8.mhz().into(),
        }
    }

    /// 8 MHz HXTAL through the PLL to 108 MHz, APB1 at half speed
    pub fn pll_108mhz() -> Self {
        Clocks {
            sysclk: 108.mhz().into(),
            apb1: 54.mhz().into(),
            apb2: 108.mhz().into(),
        }
    }

    /// Arbitrary frequencies, e.g. for a custom clock setup
    pub fn new(sysclk: Hertz, apb1: Hertz, apb2: Hertz) -> Self {
        Clocks { sysclk, apb1, apb2 }
    }

    /// Core clock
    pub fn sysclk(&self) -> Hertz {
        self.sysclk
    }

    /// APB1 clock
    pub fn pclk1(&self) -> Hertz {
        self.apb1
    }

    /// APB2 clock
    pub fn pclk2(&self) -> Hertz {
        self.apb2
    }

    /// Clock feeding the given USART: USART0 sits on APB2, the others on APB1
    pub fn usart(&self, id: UsartId) -> Hertz {
        match id {
            UsartId::Usart0 => self.apb2,
            UsartId::Usart1 | UsartId::Usart2 => self.apb1,
        }
    }
}

impl Default for Clocks {
    fn default() -> Self {
        Clocks::irc8m()
    }
}
