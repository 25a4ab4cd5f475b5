//! Busy-wait delays
//!
//! Spins on the core for a number of cycles derived from the system clock.
//! No timer peripheral is involved, so the delay only holds while nothing
//! else (interrupts, flash wait states) steals cycles.

use cast::u32;
use embedded_hal::blocking::delay::{DelayMs, DelayUs};

use crate::clock::Clocks;

/// Cycle-counting delay provider
pub struct CycleDelay {
    sysclk: u32,
}

impl CycleDelay {
    /// Delay calibrated to the current core frequency
    pub fn new(clocks: &Clocks) -> Self {
        CycleDelay {
            sysclk: clocks.sysclk().0,
        }
    }

    fn cycles_for_us(&self, us: u32) -> u64 {
        u64::from(us) * u64::from(self.sysclk) / 1_000_000
    }

    /// Spins for `cycles` core cycles
    pub fn delay_cycles(&mut self, mut cycles: u64) {
        while cycles > 0 {
            let chunk = cycles.min(u64::from(u32::MAX));
            // NOTE(unsafe) no side effects besides spinning
            #[allow(unused_unsafe)]
            unsafe {
                riscv::asm::delay(chunk as u32);
            }
            cycles -= chunk;
        }
    }
}

impl DelayUs<u32> for CycleDelay {
    fn delay_us(&mut self, us: u32) {
        let cycles = self.cycles_for_us(us);
        self.delay_cycles(cycles);
    }
}

impl DelayUs<u16> for CycleDelay {
    fn delay_us(&mut self, us: u16) {
        self.delay_us(u32(us))
    }
}

impl DelayUs<u8> for CycleDelay {
    fn delay_us(&mut self, us: u8) {
        self.delay_us(u32(us))
    }
}

impl DelayMs<u32> for CycleDelay {
    fn delay_ms(&mut self, ms: u32) {
        let cycles = self.cycles_for_us(1_000) * u64::from(ms);
        self.delay_cycles(cycles);
    }
}

impl DelayMs<u16> for CycleDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.delay_ms(u32(ms));
    }
}

impl DelayMs<u8> for CycleDelay {
    fn delay_ms(&mut self, ms: u8) {
        self.delay_ms(u32(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::U32Ext;

    #[test]
    fn cycles_follow_sysclk() {
        let delay = CycleDelay::new(&Clocks::irc8m());
        assert_eq!(delay.cycles_for_us(1), 8);
        assert_eq!(delay.cycles_for_us(1_000), 8_000);

        let delay = CycleDelay::new(&Clocks::pll_108mhz());
        assert_eq!(delay.cycles_for_us(u32::MAX), u64::from(u32::MAX) * 108);

        let slow = Clocks::new(32_768.hz(), 32_768.hz(), 32_768.hz());
        assert_eq!(CycleDelay::new(&slow).cycles_for_us(1_000_000), 32_768);
    }
}
