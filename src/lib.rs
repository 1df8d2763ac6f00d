//! Uberducky board support: a tiny2040 that enumerates as a USB keyboard and
//! types a built-in keystroke script from the timer interrupt.

#![no_std]

use panic_halt as _;

// Device specific
use pimoroni_tiny2040 as bsp;

use bsp::hal;
use bsp::hal::pac;

pub mod input;
pub mod leds;
pub mod script;
pub mod ticker;
pub mod usb;

/// Sets up the uberducky silicon and arms the script. Quack!
pub fn setup() -> leds::LEDChannels {
    // Grab our singleton objects
    let mut pac = pac::Peripherals::take().unwrap();

    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Configure the clocks
    //
    // The default is to generate a 125 MHz system clock
    let clocks = hal::clocks::init_clocks_and_plls(
        bsp::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();

    let sio = hal::Sio::new(pac.SIO);
    let pins = bsp::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let led_channels = leds::init_pwm(
        pac.PWM,
        &mut pac.RESETS,
        (pins.led_red, pins.led_green, pins.led_blue),
    );

    // Our button input, pressing it plays the script again
    let button_pin: input::ButtonPin = pins.bootsel.into_pull_up_input();
    input::setup_button(button_pin);

    // Prepare timer
    let mut timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let alarm0 = timer.alarm_0().unwrap();

    // Set up the USB driver
    let usb_clock = clocks.usb_clock;
    usb::setup_usb_driver(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        usb_clock,
        &mut pac.RESETS,
    );

    // Starts the tick interrupt; the first tick is a couple of seconds away
    ticker::setup_player(alarm0);

    unsafe {
        // Enable the button click interrupt
        pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0);
    };

    defmt::info!("setup done");

    led_channels
}
