use std::io::{self, Write};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::encoder::EncodedRecord;
use crate::error::SinkError;
use crate::sinks::Sink;

/// Prints each record followed by a blank line.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn deliver(&self, record: &EncodedRecord) -> Result<(), SinkError> {
        // A writer that panicked mid-record leaves nothing worth protecting.
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(record.as_bytes())?;
        out.write_all(b"\n\n")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_utils::encoded;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn records_are_separated_by_a_blank_line() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::new(Box::new(buffer.clone()));

        sink.deliver(&encoded(r#"{"callsign":"A"}"#)).await.unwrap();
        sink.deliver(&encoded(r#"{"callsign":"B"}"#)).await.unwrap();

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "{\"callsign\":\"A\"}\n\n{\"callsign\":\"B\"}\n\n");
    }

    #[tokio::test]
    async fn write_failures_surface_as_sink_errors() {
        let sink = ConsoleSink::new(Box::new(BrokenPipe));
        let err = sink.deliver(&encoded("{}")).await.unwrap_err();
        assert!(matches!(err, SinkError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }
}
