//! Scratch buffers values are encoded into.

/// Bytes kept free at the front of every buffer for the length prefix.
pub const RESERVED_PREFIX: usize = structex_varint::MAX_LEN;

/// A buffer holding one message under construction.
///
/// The first [`RESERVED_PREFIX`] bytes are reserved for the length prefix;
/// everything written through the `write_*`/`encode_*` methods lands after
/// them.
#[derive(Debug)]
pub struct EncoderState {
    buf: Vec<u8>,
}

impl EncoderState {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut buf = Vec::with_capacity(capacity.max(RESERVED_PREFIX));
        buf.resize(RESERVED_PREFIX, 0);
        Self { buf }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn encode_uint(&mut self, v: u64) {
        structex_varint::encode_uint(&mut self.buf, v);
    }

    pub fn encode_int(&mut self, v: i64) {
        structex_varint::encode_int(&mut self.buf, v);
    }

    /// Length prefixed string.
    pub fn encode_str(&mut self, s: &str) {
        self.encode_uint(s.len() as u64);
        self.write_bytes(s.as_bytes());
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[RESERVED_PREFIX..]
    }

    pub fn payload_len(&self) -> usize {
        self.buf.len() - RESERVED_PREFIX
    }

    /// Drop the payload, keeping the reserved prefix space.
    pub(crate) fn reset(&mut self) {
        self.buf.truncate(RESERVED_PREFIX);
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

/// Free list of states, so successive messages reuse their buffers.
#[derive(Debug)]
pub(crate) struct StatePool {
    free: Vec<EncoderState>,
    capacity: usize,
    buffer_capacity: usize,
}

impl StatePool {
    pub(crate) fn new(capacity: usize, buffer_capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            buffer_capacity,
        }
    }

    pub(crate) fn acquire(&mut self) -> EncoderState {
        match self.free.pop() {
            Some(mut state) => {
                state.reset();
                state
            }
            None => EncoderState::with_capacity(self.buffer_capacity),
        }
    }

    pub(crate) fn release(&mut self, mut state: EncoderState) {
        if self.free.len() < self.capacity {
            state.reset();
            self.free.push(state);
        }
    }

    pub(crate) fn idle(&self) -> usize {
        self.free.len()
    }
}
