//! Turns a streamed HTTP body into a lazy sequence of decoded frames.

use arith_mcp_core::jsonrpc;
use arith_mcp_core::{EventStreamDecoder, Frame};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

use super::transport::{ByteStream, TransportError};

pub type FrameStream = BoxStream<'static, Result<Frame, TransportError>>;

struct DecodeState {
    body: Option<ByteStream>,
    decoder: EventStreamDecoder,
    ready: VecDeque<Frame>,
}

/// Decode a `text/event-stream` body chunk by chunk. Frames are yielded as
/// soon as their terminating line arrives.
pub fn event_stream_frames(body: ByteStream) -> FrameStream {
    let state = DecodeState {
        body: Some(body),
        decoder: EventStreamDecoder::new(),
        ready: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            let body = state.body.as_mut()?;
            match body.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.feed(&chunk)),
                Some(Err(err)) => {
                    // A broken body ends the sequence; any partial frame is dropped.
                    state.body = None;
                    return Some((Err(err), state));
                }
                None => {
                    state.body = None;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

/// A plain `application/json` body holds at most one envelope.
pub fn json_body_frames(mut body: ByteStream) -> FrameStream {
    stream::once(async move {
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok::<Bytes, TransportError>(buf.freeze())
    })
    .filter_map(|res| async move {
        match res {
            Err(err) => Some(Err(err)),
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => None,
            Ok(bytes) => Some(Ok(json_frame(&bytes))),
        }
    })
    .boxed()
}

/// Pick the decoder for a response body from its content type.
pub fn frames_for(content_type: Option<&str>, body: ByteStream) -> FrameStream {
    let is_event_stream = content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/event-stream"))
        .unwrap_or(false);
    if is_event_stream {
        event_stream_frames(body)
    } else {
        json_body_frames(body)
    }
}

fn json_frame(bytes: &[u8]) -> Frame {
    match jsonrpc::decode(bytes) {
        Ok(message) => Frame::Message(message),
        Err(err) => {
            let raw = String::from_utf8_lossy(bytes).into_owned();
            warn!(error = %err, "Response body is not a JSON-RPC envelope");
            Frame::Raw(raw)
        }
    }
}
