use std::io;

/// Destination of framed messages.
///
/// Every call hands over one complete message. A failed or short write is
/// reported as an error, the encoder does not try to resume it.
pub trait Sink {
    fn write_message(&mut self, message: &[u8]) -> io::Result<()>;
}

impl<W: io::Write + ?Sized> Sink for W {
    fn write_message(&mut self, message: &[u8]) -> io::Result<()> {
        self.write_all(message)
    }
}
