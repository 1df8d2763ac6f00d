//! Duckyscript to bytecode.
//!
//! One command per line, `COMMAND [argument]`. The command word is case
//! insensitive; everything after the first space is the argument, verbatim.
//! Modifier chords are written with dashes: `CTRL-ALT DELETE` is not valid
//! (there is no DELETE key here) but `CTRL-ALT t` is.

use ducky::script::{OP_DELAY, OP_KEY, OP_STRING};
use ducky::{KeyKind, Modifier, Modifiers};
use thiserror::Error;

/// First scancode of F1..F12.
const SCANCODE_F1: u8 = 0x3a;
const SCANCODE_PRINTSCREEN: u8 = 0x46;
/// Right, left, down and up follow in that order.
const SCANCODE_RIGHT: u8 = 0x4f;
const SCANCODE_MENU: u8 = 0x76;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },
    #[error("line {line}: missing argument")]
    MissingArgument { line: usize },
    #[error("line {line}: invalid argument '{argument}'")]
    InvalidArgument { line: usize, argument: String },
    #[error("line {line}: '{modifier}' is not a modifier")]
    InvalidModifier { line: usize, modifier: String },
    #[error("line {line}: invalid function key '{key}'")]
    InvalidFunctionKey { line: usize, key: String },
    #[error("line {line}: '{value}' is not a number from 0 to 65535")]
    InvalidNumber { line: usize, value: String },
    #[error("line {line}: DELAY without a value needs a DEFAULT_DELAY first")]
    NoDefaultDelay { line: usize },
    #[error("line {line}: REPEAT with no command before it")]
    NothingToRepeat { line: usize },
    #[error("line {line}: string of {len} bytes does not fit in one STRING")]
    StringTooLong { line: usize, len: usize },
    #[error("script of {len} bytes is longer than 65535")]
    ScriptTooLong { len: usize },
}

/// One compiled instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Key {
        kind: KeyKind,
        modifiers: Modifiers,
        value: u8,
    },
    Delay(u16),
    String(Vec<u8>),
}

impl Command {
    fn char(chr: u8, modifiers: Modifiers) -> Self {
        Command::Key {
            kind: KeyKind::Char,
            modifiers,
            value: chr,
        }
    }

    fn special(kind: KeyKind, modifiers: Modifiers) -> Self {
        Command::Key {
            kind,
            modifiers,
            value: 0,
        }
    }

    fn raw(scancode: u8, modifiers: Modifiers) -> Self {
        Command::Key {
            kind: KeyKind::Raw,
            modifiers,
            value: scancode,
        }
    }

    /// Bytes the command takes in the opcode stream.
    pub fn encoded_len(&self) -> usize {
        match self {
            Command::Key { .. } => 4,
            Command::Delay(_) => 3,
            Command::String(bytes) => 3 + bytes.len(),
        }
    }

    /// Append the opcode and its operands.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Command::Key {
                kind,
                modifiers,
                value,
            } => out.extend_from_slice(&[OP_KEY, *kind as u8, modifiers.bits(), *value]),
            Command::Delay(ms) => {
                out.push(OP_DELAY);
                out.extend_from_slice(&ms.to_le_bytes());
            }
            Command::String(bytes) => {
                out.push(OP_STRING);
                // Length is checked when the command is parsed
                out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                out.extend_from_slice(bytes);
            }
        }
    }
}

/// Map the aliases Duckyscript accepts to one spelling. Expects lowercase.
fn canonical(word: &str) -> &str {
    match word {
        "windows" | "command" => "gui",
        "ctrl" => "control",
        "app" => "menu",
        "defaultdelay" => "default_delay",
        "escape" => "esc",
        "backspace" => "back",
        "uparrow" => "up",
        "downarrow" => "down",
        "leftarrow" => "left",
        "rightarrow" => "right",
        other => other,
    }
}

fn modifier(word: &str) -> Option<Modifier> {
    Some(match word {
        "gui" => Modifier::Meta,
        "shift" => Modifier::Shift,
        "alt" => Modifier::Alt,
        "control" => Modifier::Ctrl,
        _ => return None,
    })
}

fn is_command(word: &str) -> bool {
    modifier(word).is_some()
        || function_key(word).is_some()
        || matches!(
            word,
            "rem"
                | "string"
                | "enter"
                | "default_delay"
                | "delay"
                | "menu"
                | "up"
                | "down"
                | "left"
                | "right"
                | "tab"
                | "esc"
                | "back"
                | "space"
                | "repeat"
                | "printscreen"
        )
}

/// `f1` to `f12`, as 1 to 12.
fn function_key(word: &str) -> Option<u8> {
    let n: u8 = word.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

fn number(line: usize, arg: &str) -> Result<u16, CompileError> {
    arg.trim().parse().map_err(|_| CompileError::InvalidNumber {
        line,
        value: arg.to_string(),
    })
}

/// The keystroke a key name (or single character) stands for.
fn key(line: usize, arg: &str, modifiers: Modifiers) -> Result<Command, CompileError> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (None, _) => return Err(CompileError::MissingArgument { line }),
        (Some(chr), None) if chr.is_ascii() => return Ok(Command::char(chr as u8, modifiers)),
        _ => {}
    }

    let lower = arg.to_ascii_lowercase();
    let name = canonical(&lower);
    Ok(match name {
        "space" => Command::char(b' ', modifiers),
        "enter" => Command::special(KeyKind::Enter, modifiers),
        "tab" => Command::special(KeyKind::Tab, modifiers),
        "esc" => Command::special(KeyKind::Escape, modifiers),
        "back" => Command::special(KeyKind::Backspace, modifiers),
        "menu" => Command::raw(SCANCODE_MENU, modifiers),
        "printscreen" => Command::raw(SCANCODE_PRINTSCREEN, modifiers),
        "right" => Command::raw(SCANCODE_RIGHT, modifiers),
        "left" => Command::raw(SCANCODE_RIGHT + 1, modifiers),
        "down" => Command::raw(SCANCODE_RIGHT + 2, modifiers),
        "up" => Command::raw(SCANCODE_RIGHT + 3, modifiers),
        _ => match function_key(name) {
            Some(n) => Command::raw(SCANCODE_F1 + n - 1, modifiers),
            None if name.starts_with('f') && name[1..].bytes().all(|b| b.is_ascii_digit()) => {
                return Err(CompileError::InvalidFunctionKey {
                    line,
                    key: arg.to_string(),
                })
            }
            None => {
                return Err(CompileError::InvalidArgument {
                    line,
                    argument: arg.to_string(),
                })
            }
        },
    })
}

/// Commands parsed so far, and the size of the stream they will encode to.
#[derive(Default)]
struct Program {
    commands: Vec<Command>,
    stream_len: usize,
}

impl Program {
    /// Account for `extra` more stream bytes, failing once the stream can no
    /// longer be described by the u16 prefix.
    fn grow(&mut self, extra: usize) -> Result<(), CompileError> {
        self.stream_len = self.stream_len.saturating_add(extra);
        if self.stream_len > usize::from(u16::MAX) {
            return Err(CompileError::ScriptTooLong {
                len: self.stream_len,
            });
        }
        Ok(())
    }

    fn push(&mut self, command: Command) -> Result<(), CompileError> {
        self.grow(command.encoded_len())?;
        self.commands.push(command);
        Ok(())
    }

    /// Emit the previous command `count` more times.
    fn repeat(&mut self, line: usize, count: u16) -> Result<(), CompileError> {
        let previous = self
            .commands
            .last()
            .cloned()
            .ok_or(CompileError::NothingToRepeat { line })?;
        self.grow(previous.encoded_len().saturating_mul(usize::from(count)))?;
        self.commands.extend(std::iter::repeat(previous).take(usize::from(count)));
        Ok(())
    }
}

/// Parse a whole script into commands.
pub fn parse(source: &str) -> Result<Vec<Command>, CompileError> {
    let mut program = Program::default();
    let mut default_delay: Option<u16> = None;

    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let text = text.trim_end_matches('\r');
        let (word, arg) = match text.split_once(' ') {
            Some((word, arg)) => (word, Some(arg)),
            None => (text, None),
        };
        if word.is_empty() {
            continue;
        }

        let lower = word.to_ascii_lowercase();

        if lower.contains('-') {
            let mut modifiers = Modifiers::empty();
            for part in lower.split('-') {
                match modifier(canonical(part)) {
                    Some(m) => modifiers |= m,
                    None => {
                        return Err(CompileError::InvalidModifier {
                            line,
                            modifier: part.to_string(),
                        })
                    }
                }
            }
            program.push(key(line, arg.unwrap_or(""), modifiers)?)?;
            continue;
        }

        let name = canonical(&lower);
        if !is_command(name) {
            return Err(CompileError::UnknownCommand {
                line,
                command: word.to_string(),
            });
        }

        if let Some(m) = modifier(name) {
            let command = match arg {
                None | Some("") => Command::raw(0, m.into()),
                Some(arg) => key(line, arg, m.into())?,
            };
            program.push(command)?;
            continue;
        }

        match name {
            "rem" => {}
            "string" => {
                let bytes = arg.unwrap_or("").as_bytes();
                if bytes.len() > usize::from(u16::MAX) {
                    return Err(CompileError::StringTooLong {
                        line,
                        len: bytes.len(),
                    });
                }
                if !bytes.is_ascii() {
                    log::warn!("line {line}: non-ASCII characters are typed as spaces");
                }
                if !bytes.is_empty() {
                    program.push(Command::String(bytes.to_vec()))?;
                }
            }
            "default_delay" => {
                let arg = arg.ok_or(CompileError::MissingArgument { line })?;
                default_delay = Some(number(line, arg)?);
            }
            "delay" => {
                let ms = match arg {
                    Some(arg) => number(line, arg)?,
                    None => default_delay.ok_or(CompileError::NoDefaultDelay { line })?,
                };
                program.push(Command::Delay(ms))?;
            }
            "repeat" => {
                let count = match arg {
                    Some(arg) => number(line, arg)?,
                    None => 1,
                };
                program.repeat(line, count)?;
            }
            _ => program.push(key(line, name, Modifiers::empty())?)?,
        }
    }

    log::debug!(
        "parsed {} commands, {} bytes",
        program.commands.len(),
        program.stream_len
    );
    Ok(program.commands)
}

/// Encode commands as a script: the u16 LE stream length, then the stream.
pub fn assemble(commands: &[Command]) -> Result<Vec<u8>, CompileError> {
    let mut stream = Vec::new();
    for command in commands {
        command.encode(&mut stream);
    }

    let len = u16::try_from(stream.len())
        .map_err(|_| CompileError::ScriptTooLong { len: stream.len() })?;

    let mut script = Vec::with_capacity(stream.len() + 2);
    script.extend_from_slice(&len.to_le_bytes());
    script.extend_from_slice(&stream);
    Ok(script)
}

/// Parse and assemble in one go.
pub fn compile(source: &str) -> Result<Vec<u8>, CompileError> {
    assemble(&parse(source)?)
}
