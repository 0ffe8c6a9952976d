//! WebSocket channels.
//!
//! Frames travel as binary WebSocket messages. Ping/pong is answered by
//! tungstenite; a close frame or a dropped TCP connection is reported as an
//! orderly close.

use std::io::ErrorKind;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::channel::Channel;
use crate::error::{Result, SessionError};

/// A [`Channel`] over an established WebSocket.
pub struct WebSocketChannel<S> {
    stream: WebSocketStream<S>,
    peer: String,
}

impl<S> WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established WebSocket stream.
    pub fn new(stream: WebSocketStream<S>, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
        }
    }
}

#[async_trait]
impl<S> Channel for WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Ok(Message::Binary(data))) => return Ok(Some(Bytes::from(data))),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Text(_))) => {
                    return Err(SessionError::ProtocolViolation(
                        "text frame on binary channel".into(),
                    ))
                }
                Some(Err(e)) if is_disconnect(&e) => return Ok(None),
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
            }
        }
    }

    async fn send(&mut self, frame: Bytes) -> Result<()> {
        self.stream
            .send(Message::Binary(frame.to_vec()))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(e) if is_disconnect(&e) => Ok(()),
            Err(e) => Err(SessionError::Transport(e.to_string())),
        }
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

/// Peer went away, with or without a close handshake.
fn is_disconnect(e: &WsError) -> bool {
    match e {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

/// Dial a WebSocket endpoint such as `ws://localhost:2112/simio`.
pub async fn connect(url: &str) -> Result<WebSocketChannel<MaybeTlsStream<TcpStream>>> {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| SessionError::Handshake(e.to_string()))?;
    Ok(WebSocketChannel::new(stream, url))
}

/// Complete the server side of the opening handshake.
///
/// With `path` set, upgrade requests for any other path are answered
/// with 404 and fail the handshake.
pub async fn accept<S>(
    stream: S,
    peer: impl Into<String>,
    path: Option<&str>,
) -> Result<WebSocketChannel<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let expected = path.map(str::to_owned);
    let check_path = move |request: &Request, response: Response| match expected {
        Some(ref wanted) if request.uri().path() != wanted.as_str() => {
            let mut rejection: ErrorResponse =
                ErrorResponse::new(Some(format!("no endpoint at {}", request.uri().path())));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
        _ => Ok(response),
    };

    let stream = tokio_tungstenite::accept_hdr_async(stream, check_path)
        .await
        .map_err(|e| SessionError::Handshake(e.to_string()))?;
    Ok(WebSocketChannel::new(stream, peer))
}
