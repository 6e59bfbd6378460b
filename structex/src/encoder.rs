use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::{
    config::Config,
    frame,
    registry::TypeRegistry,
    state::{EncoderState, StatePool},
    writer::Sink,
    Encode, EncodeError, Result,
};

/// Writes self-describing messages to a [`Sink`].
///
/// The first value of every type is preceded by descriptor messages for the
/// type and the types it is built from, so the reader needs no schema. Each
/// call to [`Encoder::encode`] runs under one lock: the messages of two
/// concurrent calls never interleave.
///
/// Once a call fails the error sticks: every following call returns it
/// without writing anything, since the stream may have been left
/// half-written. [`Encoder::clear_error`] lifts it.
pub struct Encoder<W> {
    inner: Mutex<Inner<W>>,
}

struct Inner<W> {
    sink: W,
    config: Config,
    registry: TypeRegistry,
    pool: StatePool,
    err: Option<EncodeError>,
}

impl<W: Sink> Encoder<W> {
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, Config::default())
    }

    pub fn with_config(sink: W, config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink,
                config,
                registry: TypeRegistry::new(),
                pool: StatePool::new(config.pool_capacity(), config.initial_buffer_capacity()),
                err: None,
            }),
        }
    }

    /// Transmit `value` as one data message, preceded by any descriptor
    /// messages its type still needs.
    pub fn encode<T: Encode>(&self, value: &T) -> Result<()> {
        self.inner.lock().encode(value)
    }

    /// The sticky error, if a previous call failed.
    pub fn error(&self) -> Option<EncodeError> {
        self.inner.lock().err.clone()
    }

    /// Forget the sticky error. Types already described stay described.
    pub fn clear_error(&self) {
        self.inner.lock().err = None;
    }

    /// Id values of `T` are announced with, if `T` was encoded before.
    pub fn type_id_of<T: Encode>(&self) -> Option<i64> {
        self.inner.lock().registry.sent_id(&T::type_ref())
    }

    /// Number of types in the sent set.
    pub fn sent_types(&self) -> usize {
        self.inner.lock().registry.sent_len()
    }

    pub fn config(&self) -> Config {
        self.inner.lock().config
    }

    /// Exclusive access to the sink, e.g. to flush it.
    pub fn sink(&self) -> MappedMutexGuard<'_, W> {
        MutexGuard::map(self.inner.lock(), |inner| &mut inner.sink)
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner().sink
    }
}

impl<W: Sink> Inner<W> {
    fn encode<T: Encode>(&mut self, value: &T) -> Result<()> {
        if let Some(err) = &self.err {
            log::warn!("encoder is failed, skipping value: {}", err);
            return Err(err.clone());
        }

        let result = self.encode_value(value);
        if let Err(err) = &result {
            log::debug!("encoding {} failed: {}", T::type_ref().name(), err);
            self.err = Some(err.clone());
        }
        result
    }

    fn encode_value<T: Encode>(&mut self, value: &T) -> Result<()> {
        if value.is_nil() {
            return Err(EncodeError::InvalidValue(format!(
                "cannot encode nil pointer to {}",
                T::type_ref().name()
            )));
        }

        let mut state = self.pool.acquire();
        let result = self.encode_with(&mut state, value);
        self.pool.release(state);
        result
    }

    fn encode_with<T: Encode>(&mut self, state: &mut EncoderState, value: &T) -> Result<()> {
        let max_message_len = self.config.max_message_len();
        let id = self
            .registry
            .ensure_sent(&mut self.sink, state, T::type_ref(), max_message_len)?;

        state.encode_int(id);
        value.encode(state)?;
        frame::write_message(&mut self.sink, state, max_message_len)
    }
}
