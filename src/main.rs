//! An HID/Keyboard device that types a preloaded keystroke script.

#![no_std]
#![no_main]

use bsp::entry;
use defmt_rtt as _;

// Device specific
use pimoroni_tiny2040 as bsp;

use uberducky::{ticker, usb};

/// Entry point to our bare-metal application.
///
/// The `#[entry]` macro ensures the Cortex-M start-up code calls this function
/// as soon as all global variables are initialised.
///
/// Everything script related happens in the timer interrupt; the main loop
/// only keeps the USB stack going and the status LED up to date.
#[entry]
fn main() -> ! {
    defmt::info!("uberducky starting");

    let mut led_channels = uberducky::setup();

    loop {
        usb::poll();
        led_channels.show(ticker::status(), usb::configured());
    }
}
