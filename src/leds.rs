// Module driving the RGB status LED through PWM.
//
// One PWM cycle is driven via the main 125Mhz clock, via a divider. Then,
// each cycle contains N cycle ticks. Out of a cycle, a LED is OFF while on
// "duty" (because the tiny 2040 LEDs are active low) and hence the OFF time
// is dictated by the "duty" or "duty cycle".
//
// See RP2040 datasheet Section 4.5.2.1 (Pulse Width Modulation)

// Device specific
use pimoroni_tiny2040 as bsp;

use bsp::hal::{gpio, pac, pwm};
use embedded_hal::pwm::SetDutyCycle;

use ducky::Lifecycle;

use crate::ticker::Status;

// clock divider: 125Mhz / 255 ~= 500kHz
const PWM_DIV: u8 = u8::MAX;

// Period in ticks: 512 ticks -> 500kHz / 512 ~= 1kHz (i.e. 1PWM cycle ~= 1ms)
const PWM_TOP: u16 = 512;

type Slice1 = pwm::Slice<pwm::Pwm1, pwm::FreeRunning>;
type Slice2 = pwm::Slice<pwm::Pwm2, pwm::FreeRunning>;

// PWM channels for each pin, refer to RGB led pins here:
//  https://shop.pimoroni.com/products/tiny-2040
// and RP2040 datasheet PWM channels(4.5.2 Programmer's Model)
pub struct LEDChannels {
    // GPIO 18 -> PWM 1A
    red: pwm::Channel<Slice1, pwm::A>,
    // GPIO 19 -> PWM 1B
    green: pwm::Channel<Slice1, pwm::B>,
    // GPIO 20 -> PWM 2A
    blue: pwm::Channel<Slice2, pwm::A>,
    // What the LED currently shows
    shown: Option<(u8, u8, u8)>,
}

impl LEDChannels {
    // NOTE: duty "on/off" is inverted because LEDs are active low
    // NOTE: we 'unwrap' because the error is actually Infallible

    /// Brightness of each colour, in percent.
    pub fn set_rgb(&mut self, r: u8, g: u8, b: u8) {
        let convert = |v: u8| 100 - v.min(100);
        self.red.set_duty_cycle_percent(convert(r)).unwrap();
        self.green.set_duty_cycle_percent(convert(g)).unwrap();
        self.blue.set_duty_cycle_percent(convert(b)).unwrap();
    }

    /// Show what playback is up to. Dim white until the host configured us,
    /// then red when idle (bright after a broken script), blue while armed
    /// and green while typing.
    pub fn show(&mut self, status: Status, usb_configured: bool) {
        let rgb = match (usb_configured, status.lifecycle) {
            (false, _) => (5, 5, 5),
            (true, Lifecycle::Idle) if status.faulted => (80, 0, 0),
            (true, Lifecycle::Idle) => (10, 0, 0),
            (true, Lifecycle::Ready) => (0, 0, 40),
            (true, Lifecycle::Running) => (0, 40, 0),
        };

        if self.shown != Some(rgb) {
            self.set_rgb(rgb.0, rgb.1, rgb.2);
            self.shown = Some(rgb);
        }
    }
}

type LEDPins = (
    gpio::Pin<gpio::bank0::Gpio18, gpio::FunctionNull, gpio::PullDown>,
    gpio::Pin<gpio::bank0::Gpio19, gpio::FunctionNull, gpio::PullDown>,
    gpio::Pin<gpio::bank0::Gpio20, gpio::FunctionNull, gpio::PullDown>,
);

pub fn init_pwm(pwm_regs: pac::PWM, resets: &mut pac::RESETS, led_pins: LEDPins) -> LEDChannels {
    // Configure PWM
    let slices = pwm::Slices::new(pwm_regs, resets);

    let mut slice1 = slices.pwm1;
    let mut slice2 = slices.pwm2;

    // Set up cycle duration
    slice1.set_top(PWM_TOP);
    slice1.set_div_int(PWM_DIV);
    slice2.set_top(PWM_TOP);
    slice2.set_div_int(PWM_DIV);
    slice1.enable();
    slice2.enable();

    let mut red = slice1.channel_a;
    let mut green = slice1.channel_b;
    let mut blue = slice2.channel_a;

    red.output_to(led_pins.0);
    green.output_to(led_pins.1);
    blue.output_to(led_pins.2);

    let mut channels = LEDChannels {
        red,
        green,
        blue,
        shown: None,
    };
    channels.set_rgb(0, 0, 0);
    channels
}
