//! Compiled scripts played back by the firmware's state machine.

use ducky::playback::Playback;
use ducky::{Report, Script, Transport, Wake};

#[derive(Default)]
struct Recorder(Vec<Report>);

impl Transport for Recorder {
    fn send(&mut self, report: Report) {
        self.0.push(report);
    }
}

/// Play a whole script, returning the reports that went out and the total
/// time it took in milliseconds.
fn play(source: &str) -> (Vec<Report>, u32) {
    let bytes = duckc::compile(source).unwrap();
    let script = Script::new(&bytes);
    let mut playback = Playback::new(10);
    playback.arm().unwrap();

    let mut recorder = Recorder::default();
    let mut elapsed = 0;
    for _ in 0..100_000 {
        let transition = playback.step(&script, &mut recorder);
        assert_eq!(transition.fault, None);
        match transition.wake {
            Wake::After(ms) => elapsed += ms,
            Wake::Disarm => return (recorder.0, elapsed),
        }
    }
    panic!("script never finished");
}

/// Key-down reports only, as (modifier, scancode).
fn presses(reports: &[Report]) -> Vec<(u8, u8)> {
    reports
        .iter()
        .filter(|r| **r != Report::ALL_KEYS_UP)
        .map(|r| (r.modifier(), r.scancode()))
        .collect()
}

#[test]
fn run_dialog_payload() {
    let (reports, _) = play("REM open a terminal\nGUI r\nDELAY 500\nSTRING cmd\nENTER\n");

    assert_eq!(
        presses(&reports),
        [(0x08, 0x15), (0, 0x06), (0, 0x10), (0, 0x07), (0, 0x28)]
    );
    // Every press is followed by a release
    assert_eq!(reports.len(), 10);
    for pair in reports.chunks(2) {
        assert_eq!(pair[1], Report::ALL_KEYS_UP);
    }
}

#[test]
fn chords_and_shifted_characters() {
    let (reports, _) = play("CTRL-ALT t\nSTRING A!\nALT F4\n");

    assert_eq!(
        presses(&reports),
        [(0x05, 0x17), (0x02, 0x04), (0x02, 0x1e), (0x04, 0x3d)]
    );
}

#[test]
fn delays_are_waited_for() {
    let (_, quick) = play("TAB\nTAB\n");
    let (_, slow) = play("TAB\nDELAY 1000\nTAB\n");

    assert!(slow >= quick + 1000);
}

#[test]
fn repeated_commands_are_played() {
    let (reports, _) = play("DOWN\nREPEAT 3\n");
    assert_eq!(presses(&reports), [(0, 0x51); 4]);
}

#[test]
fn empty_script_types_nothing() {
    let (reports, _) = play("REM nothing\n");
    assert!(reports.is_empty());
}
