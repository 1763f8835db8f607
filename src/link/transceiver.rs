//! Half-duplex radio endpoint abstraction and its serial-bridge implementation
//!
//! The radio is reached through a USB-serial bridge that forwards raw 32-byte
//! frames in both directions and performs the radio's own auto-acknowledge.

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::RadioConfig;
use crate::error::{Result, TelemetryLinkError};
use crate::packet::decoder::decode;
use crate::packet::protocol::{Frame, FRAME_SIZE};

/// Device paths tried when no port is configured (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial radio bridges
    "/dev/ttyACM0", // USB CDC bridges
];

/// Reads drained per `available` call before giving up on a chatty port
const MAX_READS_PER_POLL: usize = 8;

/// Single radio endpoint that is either receiving or transmitting
#[async_trait]
pub trait Transceiver: Send {
    /// Enter receive mode
    async fn start_listening(&mut self) -> io::Result<()>;

    /// Leave receive mode so a frame can be transmitted
    async fn stop_listening(&mut self) -> io::Result<()>;

    /// Whether a complete inbound frame is waiting
    async fn available(&mut self) -> io::Result<bool>;

    /// Take the waiting inbound frame
    ///
    /// Fails with `WouldBlock` when no frame is available.
    async fn read_frame(&mut self) -> io::Result<Frame>;

    /// Transmit one frame; `Ok(false)` means the peer did not acknowledge it
    async fn write_frame(&mut self, frame: &Frame) -> io::Result<bool>;
}

/// Radio bridge on a serial port
///
/// Holds at most one complete inbound frame; frames arriving while one is
/// unread are dropped, as on the radio's single-depth receive buffer.
///
/// The byte stream has no delimiters, so the receive buffer is kept aligned
/// by discarding leading bytes until the first 32 of them decode as a frame.
pub struct SerialTransceiver<S = tokio_serial::SerialStream> {
    io: S,
    rx: BytesMut,
    listening: bool,
    device_path: String,
}

impl<S> std::fmt::Debug for SerialTransceiver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransceiver")
            .field("device_path", &self.device_path)
            .field("listening", &self.listening)
            .field("buffered", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl SerialTransceiver {
    /// Open the configured port, or auto-detect the bridge when none is set
    ///
    /// # Errors
    ///
    /// Returns `LinkHardwareUnavailable` if no candidate port can be opened.
    pub fn open(config: &RadioConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Try each path in order and keep the first that opens
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open radio bridge: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
                    return Ok(Self::from_io(port, path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TelemetryLinkError::LinkHardwareUnavailable(paths.join(", ")))
    }

    /// Open one port 8N1 and discard anything buffered before we attached
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::{ClearBuffer, SerialPort};

        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TelemetryLinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        port.clear(ClearBuffer::Input)
            .map_err(|e| TelemetryLinkError::Serial(format!("Failed to clear {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<S> SerialTransceiver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open byte stream
    pub fn from_io(io: S, device_path: &str) -> Self {
        Self {
            io,
            rx: BytesMut::with_capacity(2 * FRAME_SIZE),
            listening: false,
            device_path: device_path.to_string(),
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Discard leading bytes until the buffer starts with a decodable frame
    ///
    /// Stops once fewer than a frame's worth of bytes remain.
    fn resync(&mut self) {
        let mut skipped = 0usize;
        while self.rx.len() >= FRAME_SIZE && !starts_with_frame(&self.rx) {
            self.rx.advance(1);
            skipped += 1;
        }
        if skipped > 0 {
            debug!("Skipped {} byte(s) to resynchronize on {}", skipped, self.device_path);
        }
    }

    /// Keep the oldest complete frame plus any trailing partial frame
    fn drop_backlog(&mut self) {
        let whole = self.rx.len() / FRAME_SIZE * FRAME_SIZE;
        if whole > FRAME_SIZE {
            let partial = self.rx.split_off(whole);
            self.rx.truncate(FRAME_SIZE);
            self.rx.unsplit(partial);
            debug!("Receive buffer full, dropped {} frame(s)", whole / FRAME_SIZE - 1);
        }
    }

    /// Pull whatever the port has ready without waiting
    async fn fill(&mut self) -> io::Result<()> {
        for _ in 0..MAX_READS_PER_POLL {
            match tokio::time::timeout(Duration::ZERO, self.io.read_buf(&mut self.rx)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    self.resync();
                    self.drop_backlog();
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => break,
            }
        }
        Ok(())
    }
}

fn starts_with_frame(buf: &[u8]) -> bool {
    <&Frame>::try_from(&buf[..FRAME_SIZE])
        .map(|frame| decode(frame).is_ok())
        .unwrap_or(false)
}

#[async_trait]
impl<S> Transceiver for SerialTransceiver<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn start_listening(&mut self) -> io::Result<()> {
        self.listening = true;
        Ok(())
    }

    async fn stop_listening(&mut self) -> io::Result<()> {
        self.listening = false;
        Ok(())
    }

    async fn available(&mut self) -> io::Result<bool> {
        if !self.listening {
            return Ok(false);
        }
        self.resync();
        if self.rx.len() < FRAME_SIZE {
            self.fill().await?;
        }
        Ok(self.rx.len() >= FRAME_SIZE)
    }

    async fn read_frame(&mut self) -> io::Result<Frame> {
        if self.rx.len() < FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "no complete frame buffered"));
        }

        let bytes = self.rx.split_to(FRAME_SIZE);
        let mut frame = [0u8; FRAME_SIZE];
        frame.copy_from_slice(&bytes);
        Ok(frame)
    }

    async fn write_frame(&mut self, frame: &Frame) -> io::Result<bool> {
        self.io.write_all(frame).await?;
        self.io.flush().await?;
        debug!("Wrote frame 0x{:02X} to {}", frame[0], self.device_path);
        Ok(true)
    }
}
