//! Encoder settings.

/// Payloads of this many bytes or more are rejected by default.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1 << 30;

/// Number of idle encoder states kept for reuse by default.
pub const DEFAULT_POOL_CAPACITY: usize = 4;

/// Capacity new state buffers start with, including the reserved prefix.
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_message_len: usize,
    pool_capacity: usize,
    initial_buffer_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            initial_buffer_capacity: DEFAULT_INITIAL_BUFFER_CAPACITY,
        }
    }

    /// Set the payload length at which messages are rejected.
    ///
    /// A payload of `max_message_len - 1` bytes is still accepted.
    pub fn with_max_message_len(mut self, max_message_len: usize) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    /// Set how many released states the free list retains.
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    pub fn with_initial_buffer_capacity(mut self, initial_buffer_capacity: usize) -> Self {
        self.initial_buffer_capacity = initial_buffer_capacity;
        self
    }

    pub fn max_message_len(&self) -> usize {
        self.max_message_len
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    pub fn initial_buffer_capacity(&self) -> usize {
        self.initial_buffer_capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
