pub mod reader;
pub mod writer;

pub use reader::ReaderError;
pub use writer::WriterError;

use std::collections::HashMap;

/// Largest message the resolver will read or write. Plain UDP clients
/// are still capped at 512 bytes by the server layer.
pub const PACKET_SIZE: usize = 4096;

/// A fixed-size packet buffer with a cursor, used for both parsing and
/// assembling messages. `name_offsets` remembers where each name suffix
/// was written so later owner names can compress into pointers.
#[derive(Debug, Clone)]
pub struct BytePacketBuffer {
    pub buf: [u8; PACKET_SIZE],
    pub pos: usize,
    pub(crate) name_offsets: HashMap<String, usize>,
}

impl Default for BytePacketBuffer {
    fn default() -> Self {
        BytePacketBuffer {
            buf: [0; PACKET_SIZE],
            pos: 0,
            name_offsets: HashMap::new(),
        }
    }
}

impl BytePacketBuffer {
    pub fn new(buf: [u8; PACKET_SIZE]) -> Self {
        Self {
            buf,
            ..Default::default()
        }
    }

    /// Current position within buffer
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The written or read portion of the buffer.
    pub fn filled(&self) -> &[u8] {
        &self.buf[0..self.pos]
    }
}
