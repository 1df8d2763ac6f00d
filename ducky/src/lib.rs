//! Keystroke script playback for the uberducky.
//!
//! A script is a small bytecode program (see [`script`]) of keys, strings and
//! delays. The [`scheduler::Scheduler`] plays it back one transition per timer
//! tick, turning each keystroke into an 8-byte HID report with [`hid::encode`]
//! and handing it to a [`hid::Transport`]. Nothing here blocks or allocates:
//! the whole engine is meant to run inside a timer interrupt.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod config;
pub mod hid;
pub mod playback;
pub mod radio;
pub mod scheduler;
pub mod script;

pub use config::Config;
pub use hid::{KeyKind, Keystroke, Modifier, Modifiers, Report, Transport};
pub use playback::{ArmError, Lifecycle, Wake};
pub use scheduler::{Scheduler, Timer};
pub use script::{Fault, Script};
