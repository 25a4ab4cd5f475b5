//! Blinks the Longan Nano's red LED (PC13) with plain register writes
//!
//! No PAC, no type states: the RCU and the port are reached through
//! `Mmio` and their offset tables only.

#![no_std]
#![no_main]

use panic_halt as _;

use embedded_hal::blocking::delay::DelayMs;
use gd32vf103_diy::clock::Clocks;
use gd32vf103_diy::delay::CycleDelay;
use gd32vf103_diy::gpio::raw::{self, GpioReg};
use gd32vf103_diy::register::{bit, Mmio, Register, RegisterAccess};
use riscv_rt::entry;

const RCU: usize = 0x4002_1000;
const PCEN: u32 = bit(4);
const RED: u32 = 13;

#[derive(Clone, Copy)]
enum RcuReg {
    Apb2en,
}

impl Register for RcuReg {
    fn offset(self) -> usize {
        match self {
            RcuReg::Apb2en => 0x18,
        }
    }
}

#[entry]
fn main() -> ! {
    // NOTE(unsafe) nothing else in this program touches the RCU or GPIOC
    let mut rcu: Mmio<RcuReg> = unsafe { Mmio::new(RCU) };
    let mut gpioc: Mmio<GpioReg> = unsafe { Mmio::new(raw::GPIOC) };

    rcu.set_bits(RcuReg::Apb2en, PCEN);
    // active low: start dark
    raw::set_level(&mut gpioc, RED, true);
    raw::set_mode(&mut gpioc, RED, raw::PUSH_PULL_OUTPUT);

    let mut delay = CycleDelay::new(&Clocks::irc8m());
    let mut lit = false;
    loop {
        lit = !lit;
        raw::set_level(&mut gpioc, RED, !lit);
        delay.delay_ms(500u32);
    }
}
