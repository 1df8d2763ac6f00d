//! The script played at boot. Generate a new one from Duckyscript with
//! `duckc --format rust payload.txt SCRIPT`.

use ducky::script::{OP_DELAY, OP_KEY, OP_STRING};

// Types "hello world" and presses enter
#[rustfmt::skip]
pub static SCRIPT: [u8; 26] = [
    24, 0,                                  // stream length
    OP_STRING, 6, 0,
    b'h', b'e', b'l', b'l', b'o', b' ',
    OP_DELAY, 0xe8, 0x03,                   // 1000 ms
    OP_STRING, 5, 0,
    b'w', b'o', b'r', b'l', b'd',
    OP_KEY, 1, 0x00, 0x00,                  // enter, no modifier
];
