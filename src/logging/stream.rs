//! Output streams
//!
//! The diagnostic channel and the result channel are both line-oriented
//! writers shared between the components of one session. Production
//! sessions bind them to stderr and stdout; tests bind them to
//! [`SharedBuffer`]s and read back what was written.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A cloneable handle to a line-oriented writer.
#[derive(Clone)]
pub struct OutputStream {
    name: &'static str,
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputStream {
    /// Wrap an arbitrary writer.
    pub fn new<W: Write + Send + 'static>(name: &'static str, writer: W) -> Self {
        Self {
            name,
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Process standard error (the default diagnostic channel).
    pub fn stderr() -> Self {
        Self::new("stderr", io::stderr())
    }

    /// Process standard output (the default result channel).
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }

    /// Stream name, for operational logging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Write `line` followed by a newline and flush.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output stream lock poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream").field("name", &self.name).finish()
    }
}

/// In-memory writer whose contents stay readable through any clone.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Written lines, without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bytes.lock().map(|b| b.is_empty()).unwrap_or(true)
    }

    /// An [`OutputStream`] that appends to this buffer.
    pub fn stream(&self, name: &'static str) -> OutputStream {
        OutputStream::new(name, self.clone())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
