//! Steps the Longan Nano's RGB LED through a few colours

#![no_std]
#![no_main]

use panic_halt as _;

use embedded_hal::blocking::delay::DelayMs;
use gd32vf103_diy::clock::Clocks;
use gd32vf103_diy::delay::CycleDelay;
use gd32vf103_diy::gpio::State;
use gd32vf103_diy::led::{Color, RgbLed};
use gd32vf103_diy::pac;
use gd32vf103_diy::prelude::*;
use riscv_rt::entry;

const SEQUENCE: [Color; 6] = [
    Color::Green,
    Color::Yellow,
    Color::White,
    Color::Magenta,
    Color::Blue,
    Color::Off,
];

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let mut rcu = dp.RCU.constrain();
    let clocks = Clocks::irc8m();

    let mut gpioa = dp.GPIOA.split(&mut rcu);
    let mut gpioc = dp.GPIOC.split(&mut rcu);

    let red = gpioc
        .pc13
        .into_push_pull_output_with_state(&mut gpioc.ctl1, State::High);
    let green = gpioa
        .pa1
        .into_push_pull_output_with_state(&mut gpioa.ctl0, State::High);
    let blue = gpioa
        .pa2
        .into_push_pull_output_with_state(&mut gpioa.ctl0, State::High);
    let mut led = RgbLed::new(red, green, blue);

    let mut delay = CycleDelay::new(&clocks);
    loop {
        for &color in SEQUENCE.iter() {
            led.show(color);
            delay.delay_ms(500u32);
        }
    }
}
