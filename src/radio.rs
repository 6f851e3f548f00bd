use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;

use crate::aprs::strip_control_header;

/// Bytes of unsent frames held back while the bridge is not reading.
const MAX_PENDING: usize = 65536 + 2;


/**
 * Provides an interface to the packet radio. Transmission is fire and forget: there is no
 * acknowledgement and nothing is retried.
 */
pub trait Radio {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Returns the next received frame, if one has arrived.
    fn receive(&mut self) -> io::Result<Option<Vec<u8>>>;
}


impl<R: Radio + ?Sized> Radio for Box<R> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        (**self).transmit(frame)
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        (**self).receive()
    }
}


/**
 * Logs frames instead of sending them. Used when no radio is configured.
 */
pub struct LogRadio;


impl Radio for LogRadio {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        info!(
            "No radio configured, not transmitting {}",
            String::from_utf8_lossy(strip_control_header(frame)));
        Ok(())
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}


/**
 * Exchanges frames with a modem bridge over a Unix domain socket. Each frame is preceded by its
 * length as a big endian u16. Frames are queued whole; whatever the socket does not take now is
 * written on the next transmit or receive, so the bridge never sees a frame cut short.
 */
pub struct SocketRadio<S: Read + Write> {
    socket: S,
    received: Vec<u8>,
    pending: Vec<u8>,
}


impl SocketRadio<UnixStream> {
    pub fn connect(path: &str) -> io::Result<SocketRadio<UnixStream>> {
        let socket = UnixStream::connect(path)?;
        socket.set_nonblocking(true)?;
        info!("Connected to radio bridge at {}", path);
        Ok(SocketRadio::new(socket))
    }
}


impl<S: Read + Write> SocketRadio<S> {
    pub fn new(socket: S) -> SocketRadio<S> {
        SocketRadio {
            socket: socket,
            received: Vec::new(),
            pending: Vec::new(),
        }
    }

    /**
     * Writes as much of the queued output as the socket accepts.
     */
    fn flush_pending(&mut self) -> io::Result<()> {
        while !self.pending.is_empty() {
            match self.socket.write(&self.pending) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "Radio bridge is not accepting data"));
                },
                Ok(count) => {
                    self.pending.drain(..count);
                },
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.socket.flush()
    }

    fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.received.len() < 2 {
            return None;
        }
        let length = u16::from_be_bytes([self.received[0], self.received[1]]) as usize;
        if self.received.len() < 2 + length {
            return None;
        }
        let frame = self.received[2..2 + length].to_vec();
        self.received.drain(..2 + length);
        Some(frame)
    }
}


impl<S: Read + Write> Radio for SocketRadio<S> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        if frame.len() > u16::MAX as usize {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("Frame of {} bytes is too long", frame.len())));
        }
        self.flush_pending()?;
        if self.pending.len() + frame.len() + 2 > MAX_PENDING {
            return Err(io::Error::new(
                ErrorKind::WouldBlock,
                format!("Radio bridge is behind by {} bytes, dropping frame", self.pending.len())));
        }
        self.pending.extend_from_slice(&(frame.len() as u16).to_be_bytes());
        self.pending.extend_from_slice(frame);
        self.flush_pending()
    }

    fn receive(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.flush_pending() {
            Ok(_) => (),
            Err(ref e) if e.kind() == ErrorKind::BrokenPipe => {
                return Err(io::Error::new(
                    ErrorKind::ConnectionAborted,
                    "Radio bridge closed the socket"));
            },
            Err(e) => return Err(e),
        }
        if let Some(frame) = self.next_frame() {
            return Ok(Some(frame));
        }
        let mut buffer = [0u8; 512];
        loop {
            match self.socket.read(&mut buffer) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::ConnectionAborted,
                        "Radio bridge closed the socket"));
                },
                Ok(count) => self.received.extend_from_slice(&buffer[..count]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.next_frame())
    }
}
