use crate::config::Config;
use crate::hid::Transport;
use crate::playback::{ArmError, Lifecycle, Playback, Wake};
use crate::script::{Fault, Script};

/// A hardware timer with a single one-shot compare event.
///
/// The tick callback registered by [`Timer::start`] must run to completion
/// before the next one can begin.
pub trait Timer {
    /// Start counting and enable the tick interrupt.
    fn start(&mut self);
    /// Fire the next tick `offset_ms` milliseconds from now, replacing any
    /// pending one.
    fn set_match(&mut self, offset_ms: u32);
    /// Cancel the pending tick, if any.
    fn clear_match(&mut self);
}

// Wrapper around the timer so that every tick reprograms it
pub struct Scheduler<'a, T, X> {
    script: Script<'a>,
    playback: Playback,
    timer: T,
    transport: X,
    config: Config,
    fault: Option<Fault>,
}

impl<'a, T: Timer, X: Transport> Scheduler<'a, T, X> {
    pub fn new(script: Script<'a>, timer: T, transport: X, config: Config) -> Self {
        Scheduler {
            script,
            playback: Playback::new(config.down_time_ms),
            timer,
            transport,
            config,
            fault: None,
        }
    }

    pub fn start(&mut self) {
        self.timer.start();
    }

    /// Arm the script to start playing `delay_ms` from now.
    pub fn arm(&mut self, delay_ms: u32) -> Result<(), ArmError> {
        match self.playback.arm() {
            Ok(()) => {
                info!("script armed, starting in {} ms", delay_ms);
                self.fault = None;
                self.timer.set_match(delay_ms);
                Ok(())
            }
            Err(err) => {
                warn!("arm request ignored: {:?}", err);
                Err(err)
            }
        }
    }

    /// Arm with the configured start delay.
    pub fn arm_default(&mut self) -> Result<(), ArmError> {
        self.arm(self.config.arm_delay_ms)
    }

    /// The timer callback. Runs one transition and programs the next tick.
    pub fn on_tick(&mut self) -> Wake {
        let transition = self.playback.step(&self.script, &mut self.transport);

        if let Some(fault) = transition.fault {
            self.fault = Some(fault);
        }

        match transition.wake {
            Wake::After(offset_ms) => self.timer.set_match(offset_ms),
            Wake::Disarm => self.timer.clear_match(),
        }

        transition.wake
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.playback.lifecycle()
    }

    /// The most recent script fault since the last arm.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn reports_sent(&self) -> u32 {
        self.playback.reports_sent()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn transport(&self) -> &X {
        &self.transport
    }
}
