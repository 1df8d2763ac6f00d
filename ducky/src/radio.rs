//! Packet post-processing for the narrowband radio receiver.
//!
//! The radio hands over packets exactly as they came off the air: whitened,
//! and with every 32-bit word in reverse bit order. Playback never touches
//! the radio; this is here for firmware that listens for packets next to it.

/// Size of one received packet.
pub const PACKET_SIZE: usize = 32;

/// XOR mask for each 32-bit word of a packet (BLE advertising channel 38).
pub const DEWHITEN: [u32; 12] = [
    0x2044c5d6, 0x8fe1de59, 0x42afa51b, 0x60cd4e7b, 0x902262eb, 0xc7f0ef2c, 0xa157d28d, 0xb066a73d,
    0x48113175, 0xe3f87796, 0xd0abe946, 0xd833539e,
];

/// Dewhiten a buffer in place.
///
/// Each group of four bytes is read as a big endian word, bit-reversed,
/// XORed with its mask and written back little endian. Only as many groups as
/// there are masks (48 bytes) are touched, and a trailing partial group is
/// left alone.
pub fn dewhiten(packet: &mut [u8]) {
    for (chunk, mask) in packet.chunks_exact_mut(4).zip(DEWHITEN) {
        let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let word = word.reverse_bits() ^ mask;
        chunk.copy_from_slice(&word.to_le_bytes());
    }
}

/// Raw access to the radio hardware.
pub trait Radio {
    /// Power up, tune and start listening.
    fn init(&mut self);
    /// Copy a received packet into `packet` and restart reception. Returns
    /// false, leaving `packet` alone, if nothing has arrived.
    fn read_packet(&mut self, packet: &mut [u8; PACKET_SIZE]) -> bool;
}

/// Hands out dewhitened packets from a [`Radio`].
pub struct Receiver<R> {
    radio: R,
}

impl<R: Radio> Receiver<R> {
    pub fn new(radio: R) -> Self {
        Receiver { radio }
    }

    pub fn init(&mut self) {
        self.radio.init();
        debug!("radio listening");
    }

    /// Fetch the next packet, if one is waiting.
    pub fn try_receive(&mut self, packet: &mut [u8; PACKET_SIZE]) -> bool {
        if !self.radio.read_packet(packet) {
            return false;
        }
        dewhiten(packet);
        true
    }

    pub fn into_inner(self) -> R {
        self.radio
    }
}
