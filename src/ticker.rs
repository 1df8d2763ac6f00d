//! The playback tick: ALARM0 of the RP2040 timer drives the script scheduler.

// Device specific
use bsp::hal;
use pimoroni_tiny2040 as bsp;

use bsp::hal::pac;
use bsp::hal::pac::interrupt;
use bsp::hal::timer::Alarm;
use hal::fugit::MicrosDurationU32;

// Locking
use core::cell::{Cell, RefCell};
use critical_section::Mutex;

use ducky::{Config, Lifecycle, Scheduler, Script, Timer};

use crate::script;
use crate::usb::UsbTransport;

/// Shortest alarm we program. A zero-length wait still has to be a separate
/// tick, and the alarm needs to be set in the future to fire at all.
const MIN_OFFSET_US: u32 = 10;

pub type Player = Scheduler<'static, AlarmTimer, UsbTransport>;

/// The scheduler, owned by the timer interrupt. The button interrupt borrows
/// it to re-arm; nothing else touches it.
static PLAYER: Mutex<RefCell<Option<Player>>> = Mutex::new(RefCell::new(None));

/// Copy of the playback status for the main loop, refreshed after every tick.
static STATUS: Mutex<Cell<Status>> = Mutex::new(Cell::new(Status::IDLE));

#[derive(Copy, Clone, PartialEq, Eq, defmt::Format)]
pub struct Status {
    pub lifecycle: Lifecycle,
    /// The last run ended on a malformed script.
    pub faulted: bool,
}

impl Status {
    const IDLE: Status = Status {
        lifecycle: Lifecycle::Idle,
        faulted: false,
    };

    fn of(player: &Player) -> Self {
        Status {
            lifecycle: player.lifecycle(),
            faulted: player.fault().is_some(),
        }
    }
}

/// The first alarm (see rp2040 datasheet chapter 4.6) as a one-shot tick.
pub struct AlarmTimer {
    alarm: hal::timer::Alarm0,
}

impl AlarmTimer {
    pub fn new(alarm: hal::timer::Alarm0) -> Self {
        AlarmTimer { alarm }
    }

    fn acknowledge(&mut self) {
        self.alarm.clear_interrupt();
    }
}

impl Timer for AlarmTimer {
    fn start(&mut self) {
        self.alarm.enable_interrupt();
        unsafe {
            // Note (safety): the handler only touches PLAYER, which is set up
            pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0);
        }
    }

    fn set_match(&mut self, offset_ms: u32) {
        let offset_us = offset_ms.saturating_mul(1000).max(MIN_OFFSET_US);
        if self
            .alarm
            .schedule(MicrosDurationU32::micros(offset_us))
            .is_err()
        {
            defmt::error!("could not schedule tick in {} ms, playback stalls", offset_ms);
        }
        self.alarm.enable_interrupt();
    }

    fn clear_match(&mut self) {
        self.alarm.disable_interrupt();
        self.alarm.clear_interrupt();
    }
}

/// Set up the player for the built-in script and arm it, so that it starts
/// typing once the host had some time to enumerate us.
pub fn setup_player(alarm0: hal::timer::Alarm0) {
    let player = Scheduler::new(
        Script::new(&script::SCRIPT),
        AlarmTimer::new(alarm0),
        UsbTransport,
        Config::DEFAULT,
    );

    critical_section::with(|cs| {
        let mut slot = PLAYER.borrow_ref_mut(cs);
        let player = slot.insert(player);
        player.start();
        if player.arm_default().is_err() {
            defmt::error!("fresh player refused to arm");
        }
        STATUS.borrow(cs).set(Status::of(player));
    });
}

/// Play the script again (button press). Ignored unless playback is idle.
pub fn rearm() {
    critical_section::with(|cs| {
        if let Some(player) = PLAYER.borrow_ref_mut(cs).as_mut() {
            if player.arm_default().is_ok() {
                defmt::info!("re-armed");
            }
            STATUS.borrow(cs).set(Status::of(player));
        }
    })
}

/// Latest playback status.
pub fn status() -> Status {
    critical_section::with(|cs| STATUS.borrow(cs).get())
}

#[interrupt]
fn TIMER_IRQ_0() {
    critical_section::with(|cs| {
        let mut player = PLAYER.borrow_ref_mut(cs);
        let Some(player) = player.as_mut() else {
            return;
        };

        player.timer_mut().acknowledge();
        let _ = player.on_tick();
        STATUS.borrow(cs).set(Status::of(player));
    })
}
