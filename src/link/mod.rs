//! # Link Multiplexer
//!
//! Half-duplex use of a single radio endpoint.
//!
//! This module handles:
//! - Switching between listening and transmitting around every send
//! - Bounded retransmission of unacknowledged frames
//! - Reading one inbound frame at a time and applying it to the store
//!
//! Decode failures are dropped here with a debug log; the sender is never told.

pub mod transceiver;

use std::time::Duration;
use tracing::{debug, trace};

use crate::config::RadioConfig;
use crate::error::Result;
use crate::packet::decoder::decode;
use crate::packet::encoder::encode;
use crate::packet::protocol::{Frame, Packet, TelemetryClass};
use crate::telemetry::store::TelemetryStore;
pub use transceiver::{SerialTransceiver, Transceiver};

/// Radio mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Listening,
    Transmitting,
}

/// A decoded inbound frame and the store class it updated, if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Received {
    pub packet: Packet,
    pub class: Option<TelemetryClass>,
}

/// Half-duplex link over one transceiver
pub struct RadioLink<T> {
    radio: T,
    state: LinkState,
    retry_count: u8,
    retry_delay: Duration,
}

impl<T> std::fmt::Debug for RadioLink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioLink")
            .field("state", &self.state)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl<T: Transceiver> RadioLink<T> {
    /// Wrap a transceiver and put it into receive mode
    ///
    /// # Errors
    ///
    /// Returns error if the radio refuses to enter receive mode.
    pub async fn new(mut radio: T, config: &RadioConfig) -> Result<Self> {
        radio.start_listening().await?;

        Ok(Self {
            radio,
            state: LinkState::Listening,
            retry_count: config.retry_count,
            retry_delay: Duration::from_micros(config.retry_delay_us),
        })
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Encode and transmit a packet
    pub async fn send(&mut self, packet: &Packet) -> Result<bool> {
        self.send_frame(&encode(packet)).await
    }

    /// Transmit one frame, retrying until acknowledged or retries run out
    ///
    /// Reception is paused for the whole attempt. The link is back in
    /// `Listening` afterwards whatever the outcome.
    ///
    /// Returns whether the peer acknowledged the frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<bool> {
        self.radio.stop_listening().await?;
        self.state = LinkState::Transmitting;

        let sent = self.transmit(frame).await;

        let restored = self.radio.start_listening().await;
        self.state = LinkState::Listening;

        let acked = sent?;
        restored?;

        if !acked {
            debug!(
                "Frame 0x{:02X} not acknowledged after {} attempts",
                frame[0],
                u32::from(self.retry_count) + 1
            );
        }
        Ok(acked)
    }

    async fn transmit(&mut self, frame: &Frame) -> std::io::Result<bool> {
        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }
            if self.radio.write_frame(frame).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Read at most one inbound frame and apply it to the store
    ///
    /// Returns `None` when nothing was waiting or the frame failed to decode.
    ///
    /// # Errors
    ///
    /// Returns error only for transceiver I/O failures.
    pub async fn poll_inbound(&mut self, store: &mut TelemetryStore) -> Result<Option<Received>> {
        if !self.radio.available().await? {
            return Ok(None);
        }

        let frame = self.radio.read_frame().await?;
        match decode(&frame) {
            Ok(packet) => {
                trace!("Received {:?}", packet.kind());
                let class = store.apply(&packet);
                Ok(Some(Received { packet, class }))
            }
            Err(e) => {
                debug!("Dropped inbound frame: {}", e);
                Ok(None)
            }
        }
    }
}
