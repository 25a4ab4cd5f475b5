//! Repeatedly sends "A" followed by a line break on USART0 (PA9/PA10)

#![no_std]
#![no_main]

use panic_halt as _;

use embedded_hal::blocking::delay::DelayMs;
use gd32vf103_diy::clock::Clocks;
use gd32vf103_diy::delay::CycleDelay;
use gd32vf103_diy::pac;
use gd32vf103_diy::prelude::*;
use gd32vf103_diy::rcu::Peripheral;
use gd32vf103_diy::serial::{Config, Usart};
use riscv_rt::entry;

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let mut rcu = dp.RCU.constrain();
    let clocks = Clocks::irc8m();

    let mut gpioa = dp.GPIOA.split(&mut rcu);
    rcu.enable(Peripheral::Afio);
    let _tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.ctl1);
    let _rx = gpioa.pa10.into_floating_input(&mut gpioa.ctl1);

    let mut usart = Usart::new(dp.USART0);
    rcu.enable(Peripheral::Usart0);
    usart.deinit(&mut rcu);
    usart.configure(&Config::default(), &clocks);
    usart.set_transmit_mode(true);
    usart.enable();

    let mut delay = CycleDelay::new(&clocks);
    loop {
        usart.transmit_bytes(b"A\r\n").ok();
        delay.delay_ms(200u32);
    }
}
