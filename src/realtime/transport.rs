//! Socket-agnostic frame plumbing for the relay.
//!
//! Both the device socket (axum) and the upstream socket (tungstenite) are
//! adapted into a boxed sink/stream pair of [`Frame`]s.

use std::pin::Pin;

use axum::extract::ws::{Message as DeviceMessage, WebSocket};
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    tungstenite::Message as UpstreamMessage, MaybeTlsStream, WebSocketStream,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

impl Frame {
    /// Data frames are relayed; control frames are handled per hop.
    pub fn is_data(&self) -> bool {
        matches!(self, Frame::Text(_) | Frame::Binary(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("device socket error: {0}")]
    Downstream(String),

    #[error("upstream socket error: {0}")]
    Upstream(String),

    #[error("upstream connect failed: {0}")]
    Connect(String),
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = RelayError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, RelayError>> + Send>>;

/// One side of the relay.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }

    /// Device side of an upgraded axum socket.
    pub fn from_device(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        let sink = sink
            .with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_device_message(frame))))
            .sink_map_err(|e| RelayError::Downstream(e.to_string()));
        let stream = stream.map(|msg| {
            msg.map(from_device_message)
                .map_err(|e| RelayError::Downstream(e.to_string()))
        });
        Self::new(Box::pin(sink), Box::pin(stream))
    }

    /// Upstream side of a tungstenite client connection.
    pub fn from_upstream(socket: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        let (sink, stream) = socket.split();
        let sink = sink
            .with(|frame: Frame| {
                future::ready(Ok::<_, tokio_tungstenite::tungstenite::Error>(
                    to_upstream_message(frame),
                ))
            })
            .sink_map_err(|e| RelayError::Upstream(e.to_string()));
        let stream = stream.filter_map(|msg| {
            future::ready(match msg {
                Ok(msg) => from_upstream_message(msg).map(Ok),
                Err(e) => Some(Err(RelayError::Upstream(e.to_string()))),
            })
        });
        Self::new(Box::pin(sink), Box::pin(stream))
    }
}

fn from_device_message(msg: DeviceMessage) -> Frame {
    match msg {
        DeviceMessage::Text(text) => Frame::Text(text.as_str().to_owned()),
        DeviceMessage::Binary(data) => Frame::Binary(data.to_vec()),
        DeviceMessage::Ping(data) => Frame::Ping(data.to_vec()),
        DeviceMessage::Pong(data) => Frame::Pong(data.to_vec()),
        DeviceMessage::Close(_) => Frame::Close,
    }
}

fn to_device_message(frame: Frame) -> DeviceMessage {
    match frame {
        Frame::Text(text) => DeviceMessage::Text(text.into()),
        Frame::Binary(data) => DeviceMessage::Binary(data.into()),
        Frame::Ping(data) => DeviceMessage::Ping(data.into()),
        Frame::Pong(data) => DeviceMessage::Pong(data.into()),
        Frame::Close => DeviceMessage::Close(None),
    }
}

fn from_upstream_message(msg: UpstreamMessage) -> Option<Frame> {
    match msg {
        UpstreamMessage::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        UpstreamMessage::Binary(data) => Some(Frame::Binary(data.to_vec())),
        UpstreamMessage::Ping(data) => Some(Frame::Ping(data.to_vec())),
        UpstreamMessage::Pong(data) => Some(Frame::Pong(data.to_vec())),
        UpstreamMessage::Close(_) => Some(Frame::Close),
        // Raw frames are never yielded while reading.
        UpstreamMessage::Frame(_) => None,
    }
}

fn to_upstream_message(frame: Frame) -> UpstreamMessage {
    match frame {
        Frame::Text(text) => UpstreamMessage::Text(text.into()),
        Frame::Binary(data) => UpstreamMessage::Binary(data.into()),
        Frame::Ping(data) => UpstreamMessage::Ping(data.into()),
        Frame::Pong(data) => UpstreamMessage::Pong(data.into()),
        Frame::Close => UpstreamMessage::Close(None),
    }
}
