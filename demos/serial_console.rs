//! LED command console on USART0 at 115200 8N1
//!
//! Type `!red`, `!green`, `!blue`, `!off`, `!rainbows` or `!status`
//! followed by Enter.

#![no_std]
#![no_main]

use panic_halt as _;

use gd32vf103_diy::clock::Clocks;
use gd32vf103_diy::console::{self, Console};
use gd32vf103_diy::gpio::State;
use gd32vf103_diy::led::RgbLed;
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
    let mut gpioc = dp.GPIOC.split(&mut rcu);
    rcu.enable(Peripheral::Afio);

    let red = gpioc
        .pc13
        .into_push_pull_output_with_state(&mut gpioc.ctl1, State::High);
    let green = gpioa
        .pa1
        .into_push_pull_output_with_state(&mut gpioa.ctl0, State::High);
    let blue = gpioa
        .pa2
        .into_push_pull_output_with_state(&mut gpioa.ctl0, State::High);
    let leds = RgbLed::new(red, green, blue);

    let _tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.ctl1);
    let _rx = gpioa.pa10.into_floating_input(&mut gpioa.ctl1);

    let mut usart = Usart::new(dp.USART0);
    rcu.enable(Peripheral::Usart0);
    usart.deinit(&mut rcu);
    usart.configure(&Config::default().baudrate(115_200.bps()), &clocks);
    usart.set_transmit_mode(true);
    usart.set_receive_mode(true);
    usart.enable();

    let mut console = Console::new(usart, leds, console::Config::default());
    console.greet().ok();
    loop {
        // line errors are ignored with the default config
        console.poll().ok();
    }
}
