//! Channel abstraction for one peer connection.
//!
//! A channel carries whole binary frames in order, reliably, and reports an
//! orderly close separately from errors. Implementations include WebSocket
//! (see [`crate::websocket`]) and an in-memory pair for tests.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// One ordered, reliable, message-framed bidirectional connection.
#[async_trait]
pub trait Channel: Send {
    /// Receive the next frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. Must be
    /// cancel-safe: dropping the future loses no frame.
    async fn recv(&mut self) -> Result<Option<Bytes>>;

    /// Send one frame.
    async fn send(&mut self, frame: Bytes) -> Result<()>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&mut self) -> Result<()>;

    /// Human-readable peer description for logs.
    fn peer(&self) -> &str;
}

#[async_trait]
impl<C: Channel + ?Sized> Channel for Box<C> {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        (**self).recv().await
    }

    async fn send(&mut self, frame: Bytes) -> Result<()> {
        (**self).send(frame).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn peer(&self) -> &str {
        (**self).peer()
    }
}

/// In-memory channels for testing.
///
/// Uses bounded tokio channels; dropping or closing one end makes the
/// other end's `recv` return `None`.
pub mod memory {
    use super::*;
    use crate::error::SessionError;
    use tokio::sync::mpsc;

    const CAPACITY: usize = 1000;

    /// One end of an in-memory connection.
    pub struct MemoryChannel {
        name: String,
        tx: Option<mpsc::Sender<Bytes>>,
        rx: mpsc::Receiver<Bytes>,
    }

    /// Create two connected channel ends.
    pub fn pair() -> (MemoryChannel, MemoryChannel) {
        named_pair("left", "right")
    }

    /// Create two connected ends with the given peer names.
    ///
    /// Each end's [`Channel::peer`] reports the name of the other end.
    pub fn named_pair(left: &str, right: &str) -> (MemoryChannel, MemoryChannel) {
        let (left_tx, right_rx) = mpsc::channel(CAPACITY);
        let (right_tx, left_rx) = mpsc::channel(CAPACITY);

        let left_end = MemoryChannel {
            name: right.to_string(),
            tx: Some(left_tx),
            rx: left_rx,
        };
        let right_end = MemoryChannel {
            name: left.to_string(),
            tx: Some(right_tx),
            rx: right_rx,
        };
        (left_end, right_end)
    }

    #[async_trait]
    impl Channel for MemoryChannel {
        async fn recv(&mut self) -> Result<Option<Bytes>> {
            Ok(self.rx.recv().await)
        }

        async fn send(&mut self, frame: Bytes) -> Result<()> {
            let tx = self
                .tx
                .as_ref()
                .ok_or_else(|| SessionError::Transport("channel closed locally".into()))?;
            tx.send(frame)
                .await
                .map_err(|_| SessionError::Transport("peer disconnected".into()))
        }

        async fn close(&mut self) -> Result<()> {
            self.tx = None;
            self.rx.close();
            Ok(())
        }

        fn peer(&self) -> &str {
            &self.name
        }
    }
}
