//! Line-oriented console sink for human-readable event messages.
//!
//! Console output is best effort: a full UART FIFO or a missing terminal
//! must never stall a control loop, so write errors are dropped.

/// Line sink.
pub trait Console {
    /// Emit one line; the sink supplies the line terminator.
    fn write_line(&mut self, line: &str);
}

impl<C: Console + ?Sized> Console for &mut C {
    fn write_line(&mut self, line: &str) {
        (**self).write_line(line);
    }
}

/// Console over any `embedded_io::Write` byte sink (PS UART, AXI UART Lite).
///
/// Lines are terminated with `"\r\n"` for serial terminals.
pub struct SerialConsole<W> {
    port: W,
}

impl<W: embedded_io::Write> SerialConsole<W> {
    /// Wrap a byte sink.
    pub fn new(port: W) -> Self {
        Self { port }
    }

    /// Give the byte sink back.
    pub fn into_inner(self) -> W {
        self.port
    }

    /// Write raw bytes without a terminator, ignoring errors.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        let _ = self.port.write_all(bytes);
    }
}

impl<W: embedded_io::Write> Console for SerialConsole<W> {
    fn write_line(&mut self, line: &str) {
        let _ = self.port.write_all(line.as_bytes());
        let _ = self.port.write_all(b"\r\n");
        let _ = self.port.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sink(heapless::Vec<u8, 64>);

    impl embedded_io::ErrorType for Sink {
        type Error = embedded_io::ErrorKind;
    }

    impl embedded_io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.0.capacity() - self.0.len());
            if n == 0 {
                return Err(embedded_io::ErrorKind::OutOfMemory);
            }
            let _ = self.0.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn lines_are_crlf_terminated() {
        let mut console = SerialConsole::new(Sink(heapless::Vec::new()));
        console.write_line("Event!");
        assert_eq!(console.into_inner().0.as_slice(), b"Event!\r\n");
    }

    #[test]
    fn full_sink_does_not_stall() {
        let mut console = SerialConsole::new(Sink(heapless::Vec::new()));
        for _ in 0..20 {
            console.write_line("Timer expired!");
        }
        assert_eq!(console.into_inner().0.len(), 64);
    }
}
