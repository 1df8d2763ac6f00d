//! Keystrokes and their encoding as 8-byte HID boot keyboard reports.

use enumflags2::{bitflags, BitFlags};
use usbd_hid::descriptor::KeyboardReport;

/// One bit of the HID modifier byte (report byte 0).
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Modifier {
    Ctrl = 0x01,
    Shift = 0x02,
    Alt = 0x04,
    Meta = 0x08,
    RightCtrl = 0x10,
    RightShift = 0x20,
    RightAlt = 0x40,
    RightMeta = 0x80,
}

pub type Modifiers = BitFlags<Modifier>;

/// What a keystroke means, as stored in the `type` operand of a KEY opcode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyKind {
    /// A printable ASCII character, US layout.
    Char = 0,
    Enter = 1,
    Tab = 2,
    Escape = 3,
    Backspace = 4,
    /// The value is sent as the scancode, untouched.
    Raw = 5,
}

impl TryFrom<u8> for KeyKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => KeyKind::Char,
            1 => KeyKind::Enter,
            2 => KeyKind::Tab,
            3 => KeyKind::Escape,
            4 => KeyKind::Backspace,
            5 => KeyKind::Raw,
            other => return Err(other),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Keystroke {
    pub kind: KeyKind,
    pub modifiers: Modifiers,
    pub value: u8,
}

impl Keystroke {
    pub fn new(kind: KeyKind, modifiers: Modifiers, value: u8) -> Self {
        Keystroke {
            kind,
            modifiers,
            value,
        }
    }

    /// A plain character with no modifiers held, as typed by STRING.
    pub fn char(chr: u8) -> Self {
        Keystroke::new(KeyKind::Char, Modifiers::empty(), chr)
    }
}

/// A boot protocol keyboard report: modifiers, reserved, then six key slots of
/// which only the first is ever used.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Report(pub [u8; 8]);

impl Report {
    /// Every key released.
    pub const ALL_KEYS_UP: Report = Report([0; 8]);

    pub fn modifier(&self) -> u8 {
        self.0[0]
    }

    pub fn scancode(&self) -> u8 {
        self.0[2]
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl From<Report> for KeyboardReport {
    fn from(report: Report) -> Self {
        let [modifier, reserved, k0, k1, k2, k3, k4, k5] = report.0;
        KeyboardReport {
            modifier,
            reserved,
            leds: 0,
            keycodes: [k0, k1, k2, k3, k4, k5],
        }
    }
}

/// Where finished reports go, normally the keyboard's interrupt IN endpoint.
///
/// Sending is fire and forget: playback never waits for the host to pick a
/// report up, and an implementation must not block.
pub trait Transport {
    fn send(&mut self, report: Report);
}

#[cfg(test)]
impl Transport for std::vec::Vec<Report> {
    fn send(&mut self, report: Report) {
        self.push(report);
    }
}

pub const SCANCODE_ENTER: u8 = 0x28;
pub const SCANCODE_ESCAPE: u8 = 0x29;
pub const SCANCODE_BACKSPACE: u8 = 0x2a;
pub const SCANCODE_TAB: u8 = 0x2b;
pub const SCANCODE_SPACE: u8 = 0x2c;

/// Scancode of a character and whether Shift must be held to produce it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Encoding {
    pub scancode: u8,
    pub shift: bool,
}

const fn plain(scancode: u8) -> Encoding {
    Encoding {
        scancode,
        shift: false,
    }
}

const fn shifted(scancode: u8) -> Encoding {
    Encoding {
        scancode,
        shift: true,
    }
}

/// What anything we can't type turns into.
const FALLBACK: Encoding = plain(SCANCODE_SPACE);

/// ' ' (0x20) through '@' (0x40)
const SYMBOLS_20: [Encoding; 33] = [
    plain(0x2c),   // ' '
    shifted(0x1e), // !
    shifted(0x34), // "
    shifted(0x20), // #
    shifted(0x21), // $
    shifted(0x22), // %
    shifted(0x24), // &
    plain(0x34),   // '
    shifted(0x26), // (
    shifted(0x27), // )
    shifted(0x25), // *
    shifted(0x2e), // +
    plain(0x36),   // ,
    plain(0x2d),   // -
    plain(0x37),   // .
    plain(0x38),   // /
    plain(0x27),   // 0
    plain(0x1e),   // 1
    plain(0x1f),   // 2
    plain(0x20),   // 3
    plain(0x21),   // 4
    plain(0x22),   // 5
    plain(0x23),   // 6
    plain(0x24),   // 7
    plain(0x25),   // 8
    plain(0x26),   // 9
    shifted(0x33), // :
    plain(0x33),   // ;
    shifted(0x36), // <
    plain(0x2e),   // =
    shifted(0x37), // >
    shifted(0x38), // ?
    shifted(0x1f), // @
];

/// '[' (0x5b) through '`' (0x60)
const SYMBOLS_5B: [Encoding; 6] = [
    plain(0x2f),   // [
    plain(0x31),   // \
    plain(0x30),   // ]
    shifted(0x23), // ^
    shifted(0x2d), // _
    plain(0x35),   // `
];

/// '{' (0x7b) through '~' (0x7e)
const SYMBOLS_7B: [Encoding; 4] = [
    shifted(0x2f), // {
    shifted(0x31), // |
    shifted(0x30), // }
    shifted(0x35), // ~
];

/// Map an ASCII character to its US layout scancode.
///
/// Characters we have no key for (control characters, DEL, anything above
/// 0x7f) are typed as a space.
pub fn encode_char(chr: u8) -> Encoding {
    match chr {
        0x20..=0x40 => SYMBOLS_20[usize::from(chr - 0x20)],
        0x5b..=0x60 => SYMBOLS_5B[usize::from(chr - 0x5b)],
        0x7b..=0x7e => SYMBOLS_7B[usize::from(chr - 0x7b)],
        b'a'..=b'z' => plain(chr - b'a' + 0x04),
        b'A'..=b'Z' => shifted(chr - b'A' + 0x04),
        _ => FALLBACK,
    }
}

/// Build the key-down report for a keystroke.
pub fn encode(keystroke: &Keystroke) -> Report {
    let mut report = [0u8; 8];
    let mut modifiers = keystroke.modifiers;

    report[2] = match keystroke.kind {
        KeyKind::Char => {
            let encoding = encode_char(keystroke.value);
            if encoding.shift {
                modifiers |= Modifier::Shift;
            }
            encoding.scancode
        }
        KeyKind::Enter => SCANCODE_ENTER,
        KeyKind::Tab => SCANCODE_TAB,
        KeyKind::Escape => SCANCODE_ESCAPE,
        KeyKind::Backspace => SCANCODE_BACKSPACE,
        KeyKind::Raw => keystroke.value,
    };
    report[0] = modifiers.bits();

    Report(report)
}
