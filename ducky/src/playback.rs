//! The playback state machine.
//!
//! Three nested levels make up one logical state:
//!
//! - [`Lifecycle`]: whether a script is waiting to start, playing or done
//! - the run state: what the current opcode is doing (idle between opcodes,
//!   holding a key, waiting out a delay, typing a string)
//! - the string state: whether the current character of a STRING is held
//!
//! [`Playback::step`] performs exactly one transition and returns when it
//! wants to be called again. It never waits: a delay is just a longer wake-up.

use crate::hid::{self, KeyKind, Keystroke, Modifiers, Report, Transport};
use crate::script::{Fault, Opcode, Script, HEADER_LEN};

/// Wake-up used by every transition that isn't pacing a key or a delay.
pub const STEP_MS: u32 = 1;

/// When the next transition should happen.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wake {
    /// Call [`Playback::step`] again this many milliseconds from now.
    After(u32),
    /// Nothing left to do until the next arm request.
    Disarm,
}

/// The outcome of one transition.
#[must_use = "the timer must be reprogrammed after every transition"]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub wake: Wake,
    /// A problem with the script met during the transition.
    pub fault: Option<Fault>,
}

impl Transition {
    fn after(ms: u32) -> Self {
        Transition {
            wake: Wake::After(ms),
            fault: None,
        }
    }

    fn disarm() -> Self {
        Transition {
            wake: Wake::Disarm,
            fault: None,
        }
    }

    fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lifecycle {
    /// Not playing, not armed.
    Idle,
    /// Armed: the next tick starts the script from the top.
    Ready,
    Running,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Between opcodes.
    Idle,
    /// A KEY opcode's key is held.
    KeyDown,
    /// A DELAY opcode's wait is elapsing.
    Delay,
    /// Typing the body of a STRING opcode.
    String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StringState {
    /// Between characters.
    Idle,
    /// A character's key is held.
    KeyDown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmError {
    /// A script is already armed or playing.
    Busy(Lifecycle),
}

/// Read positions into the script.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Cursors {
    /// Absolute offset of the next opcode (or, while typing a string, of the
    /// string's first character).
    script_position: usize,
    /// The script's length prefix.
    script_length: usize,
    /// Characters of the current string already typed.
    string_position: usize,
    string_length: usize,
}

/// What the string level tells the run level.
enum StringStep {
    Typing(Transition),
    Done,
}

/// Playback state for one script. Owns all the cursors; only [`step`] moves
/// them.
///
/// [`step`]: Playback::step
#[derive(Debug)]
pub struct Playback {
    lifecycle: Lifecycle,
    run: RunState,
    string: StringState,
    cursors: Cursors,
    down_time_ms: u32,
    reports_sent: u32,
}

impl Playback {
    pub const fn new(down_time_ms: u32) -> Self {
        Playback {
            lifecycle: Lifecycle::Idle,
            run: RunState::Idle,
            string: StringState::Idle,
            cursors: Cursors {
                script_position: 0,
                script_length: 0,
                string_position: 0,
                string_length: 0,
            },
            down_time_ms,
            reports_sent: 0,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn run_state(&self) -> RunState {
        self.run
    }

    pub fn string_state(&self) -> StringState {
        self.string
    }

    /// Absolute offset of the next opcode.
    pub fn script_position(&self) -> usize {
        self.cursors.script_position
    }

    /// Reports handed to the transport since power up.
    pub fn reports_sent(&self) -> u32 {
        self.reports_sent
    }

    /// Ask for the script to be played from the top on the next step.
    ///
    /// Only an idle machine can be armed; arming does not restart a script
    /// that is already armed or playing.
    pub fn arm(&mut self) -> Result<(), ArmError> {
        match self.lifecycle {
            Lifecycle::Idle => {
                self.lifecycle = Lifecycle::Ready;
                Ok(())
            }
            busy => Err(ArmError::Busy(busy)),
        }
    }

    /// Perform one transition.
    ///
    /// A read outside the script aborts playback: the machine goes back to
    /// [`Lifecycle::Idle`] and the fault is returned along with
    /// [`Wake::Disarm`].
    pub fn step<T: Transport>(&mut self, script: &Script<'_>, transport: &mut T) -> Transition {
        match self.advance(script, transport) {
            Ok(transition) => transition,
            Err(fault) => {
                error!("script aborted: {:?}", fault);
                self.lifecycle = Lifecycle::Idle;
                self.run = RunState::Idle;
                self.string = StringState::Idle;
                Transition::disarm().with_fault(fault)
            }
        }
    }

    fn advance<T: Transport>(
        &mut self,
        script: &Script<'_>,
        transport: &mut T,
    ) -> Result<Transition, Fault> {
        match self.lifecycle {
            Lifecycle::Idle => Ok(Transition::disarm()),
            Lifecycle::Ready => self.start(script),
            Lifecycle::Running => match self.run {
                RunState::Idle => self.next_opcode(script, transport),
                RunState::KeyDown => {
                    self.release(transport);
                    self.run = RunState::Idle;
                    Ok(Transition::after(self.down_time_ms))
                }
                // The wait already happened, it was the wake-up that got us here
                RunState::Delay => {
                    self.run = RunState::Idle;
                    Ok(Transition::after(STEP_MS))
                }
                RunState::String => match self.string_step(script, transport)? {
                    StringStep::Typing(transition) => Ok(transition),
                    StringStep::Done => {
                        self.cursors.script_position += self.cursors.string_length;
                        self.run = RunState::Idle;
                        Ok(Transition::after(STEP_MS))
                    }
                },
            },
        }
    }

    fn start(&mut self, script: &Script<'_>) -> Result<Transition, Fault> {
        self.cursors = Cursors::default();
        self.cursors.script_length = usize::from(script.declared_len()?);
        self.cursors.script_position = HEADER_LEN;
        self.lifecycle = Lifecycle::Running;
        self.run = RunState::Idle;
        self.string = StringState::Idle;

        info!("script started, {} bytes", self.cursors.script_length);
        Ok(Transition::after(STEP_MS))
    }

    fn next_opcode<T: Transport>(
        &mut self,
        script: &Script<'_>,
        transport: &mut T,
    ) -> Result<Transition, Fault> {
        let position = self.cursors.script_position;
        if position >= self.cursors.script_length {
            info!("script finished, {} reports sent", self.reports_sent);
            self.lifecycle = Lifecycle::Idle;
            return Ok(Transition::disarm());
        }

        let byte = script.read_u8(position)?;
        let operands = position + 1;

        let opcode = match Opcode::try_from(byte) {
            Ok(opcode) => opcode,
            Err(opcode) => {
                warn!("unknown opcode {} at {}, skipped", opcode, position);
                self.cursors.script_position = operands;
                return Ok(Transition::after(STEP_MS)
                    .with_fault(Fault::UnknownOpcode { opcode, position }));
            }
        };

        let transition = match opcode {
            Opcode::Nop => Transition::after(STEP_MS),
            Opcode::Key => {
                let kind = script.read_u8(operands)?;
                let modifiers = Modifiers::from_bits_truncate(script.read_u8(operands + 1)?);
                let value = script.read_u8(operands + 2)?;

                let keystroke = match KeyKind::try_from(kind) {
                    Ok(kind) => Keystroke::new(kind, modifiers, value),
                    Err(kind) => {
                        // Nothing to press, but the modifiers still go out
                        warn!("unknown key type {} at {}", kind, position);
                        Keystroke::new(KeyKind::Raw, modifiers, 0)
                    }
                };
                self.press(&keystroke, transport);
                self.run = RunState::KeyDown;
                Transition::after(self.down_time_ms)
            }
            Opcode::Delay => {
                let ms = script.read_u16(operands)?;
                self.run = RunState::Delay;
                Transition::after(u32::from(ms))
            }
            Opcode::String => {
                self.cursors.string_length = usize::from(script.read_u16(operands)?);
                self.cursors.string_position = 0;
                self.run = RunState::String;
                self.string = StringState::Idle;
                Transition::after(STEP_MS)
            }
        };

        // STRING's body stays ahead of the cursor until the string is done
        self.cursors.script_position = operands + opcode.operand_len();
        Ok(transition)
    }

    fn string_step<T: Transport>(
        &mut self,
        script: &Script<'_>,
        transport: &mut T,
    ) -> Result<StringStep, Fault> {
        match self.string {
            StringState::Idle => {
                let cursors = &mut self.cursors;
                if cursors.string_position >= cursors.string_length {
                    return Ok(StringStep::Done);
                }

                let chr = script.read_u8(cursors.script_position + cursors.string_position)?;
                cursors.string_position += 1;

                self.press(&Keystroke::char(chr), transport);
                self.string = StringState::KeyDown;
                Ok(StringStep::Typing(Transition::after(self.down_time_ms)))
            }
            StringState::KeyDown => {
                self.release(transport);
                self.string = StringState::Idle;
                Ok(StringStep::Typing(Transition::after(self.down_time_ms)))
            }
        }
    }

    fn press<T: Transport>(&mut self, keystroke: &Keystroke, transport: &mut T) {
        debug!("press {:?} ({})", keystroke.kind, keystroke.value);
        self.send(hid::encode(keystroke), transport);
    }

    fn release<T: Transport>(&mut self, transport: &mut T) {
        self.send(Report::ALL_KEYS_UP, transport);
    }

    fn send<T: Transport>(&mut self, report: Report, transport: &mut T) {
        transport.send(report);
        self.reports_sent = self.reports_sent.wrapping_add(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hid::{Modifier, SCANCODE_ENTER};
    use crate::script::{Builder, OP_KEY, OP_STRING};
    use std::vec::Vec;

    const DOWN: u32 = 10;

    fn demo() -> Vec<u8> {
        Builder::new()
            .string("hello ")
            .delay(1000)
            .string("world")
            .key(KeyKind::Enter, 0, 0)
            .build()
    }

    fn armed() -> Playback {
        let mut playback = Playback::new(DOWN);
        playback.arm().unwrap();
        playback
    }

    /// Step until the machine disarms, collecting every transition.
    fn run_to_end(
        playback: &mut Playback,
        script: &Script<'_>,
        sent: &mut Vec<Report>,
    ) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for _ in 0..10_000 {
            let transition = playback.step(script, sent);
            transitions.push(transition);
            if transition.wake == Wake::Disarm {
                return transitions;
            }
        }
        panic!("script never finished");
    }

    #[test]
    fn demo_script_types_hello_world() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let transitions = run_to_end(&mut playback, &script, &mut sent);

        assert_eq!(sent.len(), 24);
        let typed: Vec<u8> = sent.iter().step_by(2).map(|r| r.scancode()).collect();
        let expected: Vec<u8> = b"hello world"
            .iter()
            .map(|&c| hid::encode_char(c).scancode)
            .chain([SCANCODE_ENTER])
            .collect();
        assert_eq!(typed, expected);

        // Every press is followed by a release
        for pair in sent.chunks(2) {
            assert_ne!(pair[0], Report::ALL_KEYS_UP);
            assert_eq!(pair[1], Report::ALL_KEYS_UP);
        }

        let enter = sent[22];
        assert_eq!(enter.scancode(), 0x28);
        assert_eq!(enter.modifier(), 0);

        assert!(transitions.contains(&Transition::after(1000)));
        assert!(transitions.iter().all(|t| t.fault.is_none()));
        assert_eq!(playback.lifecycle(), Lifecycle::Idle);
        assert_eq!(playback.reports_sent(), 24);
    }

    #[test]
    fn start_reads_the_prefix_and_waits_one_step() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        assert_eq!(playback.step(&script, &mut sent), Transition::after(STEP_MS));
        assert_eq!(playback.lifecycle(), Lifecycle::Running);
        assert_eq!(playback.run_state(), RunState::Idle);
        assert_eq!(playback.script_position(), 2);
        assert!(sent.is_empty());
    }

    #[test]
    fn string_cursor_waits_for_the_end_of_the_string() {
        let bytes = Builder::new().string("ab").build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent); // start
        let _ = playback.step(&script, &mut sent); // STRING
        assert_eq!(playback.run_state(), RunState::String);
        assert_eq!(playback.script_position(), 5);

        let _ = playback.step(&script, &mut sent); // a down
        assert_eq!(playback.string_state(), StringState::KeyDown);
        let _ = playback.step(&script, &mut sent); // a up
        let _ = playback.step(&script, &mut sent); // b down
        let _ = playback.step(&script, &mut sent); // b up
        assert_eq!(playback.script_position(), 5);

        assert_eq!(playback.step(&script, &mut sent), Transition::after(STEP_MS));
        assert_eq!(playback.run_state(), RunState::Idle);
        assert_eq!(playback.script_position(), 7);
        assert_eq!(sent.len(), 4);
    }

    #[test]
    fn key_holds_for_down_time() {
        let bytes = Builder::new()
            .key(KeyKind::Char, Modifier::Ctrl as u8, b'c')
            .build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent);
        assert_eq!(playback.step(&script, &mut sent), Transition::after(DOWN));
        assert_eq!(playback.run_state(), RunState::KeyDown);
        assert_eq!(sent, [Report([0x01, 0, 0x06, 0, 0, 0, 0, 0])]);

        assert_eq!(playback.step(&script, &mut sent), Transition::after(DOWN));
        assert_eq!(sent[1], Report::ALL_KEYS_UP);
        assert_eq!(playback.run_state(), RunState::Idle);
    }

    #[test]
    fn zero_length_string_types_nothing() {
        let bytes = Builder::new().string("").key(KeyKind::Tab, 0, 0).build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent); // start
        let _ = playback.step(&script, &mut sent); // STRING
        assert_eq!(playback.script_position(), 5);

        // The empty string costs one extra step, and types nothing
        assert_eq!(playback.step(&script, &mut sent), Transition::after(STEP_MS));
        assert_eq!(playback.run_state(), RunState::Idle);
        assert_eq!(playback.script_position(), 5);
        assert!(sent.is_empty());

        let _ = playback.step(&script, &mut sent); // KEY
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].scancode(), 0x2b);
    }

    #[test]
    fn zero_delay_still_takes_a_step() {
        let bytes = Builder::new().delay(0).key(KeyKind::Escape, 0, 0).build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent); // start
        assert_eq!(playback.step(&script, &mut sent), Transition::after(0));
        assert_eq!(playback.run_state(), RunState::Delay);
        assert!(sent.is_empty());

        assert_eq!(playback.step(&script, &mut sent), Transition::after(STEP_MS));
        assert_eq!(playback.run_state(), RunState::Idle);
        assert!(sent.is_empty());

        let _ = playback.step(&script, &mut sent);
        assert_eq!(sent[0].scancode(), 0x29);
    }

    #[test]
    fn nop_skips_its_operand() {
        // The operand byte is a KEY opcode; it must not be executed
        let bytes = Builder::new()
            .raw(&[0, OP_KEY])
            .key(KeyKind::Backspace, 0, 0)
            .build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let transitions = run_to_end(&mut playback, &script, &mut sent);

        assert_eq!(transitions[1], Transition::after(STEP_MS));
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].scancode(), 0x2a);
    }

    #[test]
    fn finished_script_goes_quiet() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        run_to_end(&mut playback, &script, &mut sent);
        assert_eq!(playback.lifecycle(), Lifecycle::Idle);

        for _ in 0..5 {
            assert_eq!(playback.step(&script, &mut sent), Transition::disarm());
        }
        assert_eq!(sent.len(), 24);
    }

    #[test]
    fn rearming_plays_the_script_again() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut first = Vec::new();
        run_to_end(&mut playback, &script, &mut first);

        playback.arm().unwrap();
        let mut second = Vec::new();
        run_to_end(&mut playback, &script, &mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn arming_twice_is_rejected() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        assert_eq!(playback.arm(), Err(ArmError::Busy(Lifecycle::Ready)));

        let _ = playback.step(&script, &mut sent);
        let _ = playback.step(&script, &mut sent);
        let position = playback.script_position();
        assert_eq!(playback.arm(), Err(ArmError::Busy(Lifecycle::Running)));

        // Nothing was restarted
        assert_eq!(playback.script_position(), position);
        assert_eq!(playback.run_state(), RunState::String);
    }

    #[test]
    fn unarmed_machine_does_nothing() {
        let bytes = demo();
        let script = Script::new(&bytes);
        let mut playback = Playback::new(DOWN);
        let mut sent = Vec::new();

        assert_eq!(playback.step(&script, &mut sent), Transition::disarm());
        assert_eq!(playback.lifecycle(), Lifecycle::Idle);
        assert!(sent.is_empty());
    }

    #[test]
    fn unknown_opcode_is_reported_and_skipped() {
        let bytes = Builder::new().raw(&[0x42]).key(KeyKind::Enter, 0, 0).build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent);
        let transition = playback.step(&script, &mut sent);
        assert_eq!(transition.wake, Wake::After(STEP_MS));
        assert_eq!(
            transition.fault,
            Some(Fault::UnknownOpcode {
                opcode: 0x42,
                position: 2
            })
        );
        assert_eq!(playback.lifecycle(), Lifecycle::Running);

        let _ = playback.step(&script, &mut sent);
        assert_eq!(sent[0].scancode(), SCANCODE_ENTER);
    }

    #[test]
    fn truncated_key_aborts() {
        // Declares 10 bytes, but the KEY is cut short
        let bytes = [10, 0, OP_KEY, 1];
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent);
        let transition = playback.step(&script, &mut sent);

        assert_eq!(transition.wake, Wake::Disarm);
        assert_eq!(
            transition.fault,
            Some(Fault::OutOfBounds {
                position: 4,
                len: 4
            })
        );
        assert_eq!(playback.lifecycle(), Lifecycle::Idle);
        assert!(sent.is_empty());

        // A broken script can be armed again (and fails the same way)
        assert_eq!(playback.arm(), Ok(()));
    }

    #[test]
    fn string_running_off_the_buffer_aborts() {
        let bytes = [8, 0, OP_STRING, 5, 0, b'h', b'i'];
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let transitions = run_to_end(&mut playback, &script, &mut sent);

        assert_eq!(
            transitions.last().unwrap().fault,
            Some(Fault::OutOfBounds {
                position: 7,
                len: 7
            })
        );
        // "hi" made it out, and was released
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[3], Report::ALL_KEYS_UP);
    }

    #[test]
    fn missing_prefix_aborts() {
        let script = Script::new(&[3]);
        let mut playback = armed();
        let mut sent = Vec::new();

        let transition = playback.step(&script, &mut sent);
        assert_eq!(transition.wake, Wake::Disarm);
        assert!(matches!(transition.fault, Some(Fault::OutOfBounds { .. })));
        assert_eq!(playback.lifecycle(), Lifecycle::Idle);
    }

    #[test]
    fn unknown_key_type_sends_only_modifiers() {
        let bytes = Builder::new().raw(&[OP_KEY, 9, 0x08, b'x']).build();
        let script = Script::new(&bytes);
        let mut playback = armed();
        let mut sent = Vec::new();

        let _ = playback.step(&script, &mut sent);
        let _ = playback.step(&script, &mut sent);
        assert_eq!(sent, [Report([0x08, 0, 0, 0, 0, 0, 0, 0])]);
    }
}
