//! Incremental decoder for the `text/event-stream` bodies of streamable HTTP.
//!
//! Only `data:` lines matter. Each one carries a complete JSON-RPC envelope and
//! is terminated either by a blank line or by the next `data:` line. Event
//! names, ids and comments are skipped.

use bytes::BytesMut;
use serde_json::Value;
use tracing::warn;

use crate::jsonrpc::{parse_message, JsonRpcMessage};

/// One decoded frame. Payloads that are not valid JSON-RPC envelopes are kept
/// as raw text so the caller can report them without losing the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(JsonRpcMessage),
    Raw(String),
}

impl Frame {
    pub fn into_message(self) -> Option<JsonRpcMessage> {
        match self {
            Frame::Message(msg) => Some(msg),
            Frame::Raw(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitDataLine,
    HavePayload,
}

#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    /// Bytes of the current, not yet terminated line.
    buf: BytesMut,
    payload: Option<String>,
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DecoderState {
        if self.payload.is_some() {
            DecoderState::HavePayload
        } else {
            DecoderState::AwaitDataLine
        }
    }

    /// Feed a chunk of the response body, returning every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            self.process_line(&line[..pos], &mut frames);
        }
        frames
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if !self.buf.is_empty() {
            let line = self.buf.split();
            self.process_line(&line, &mut frames);
        }
        if let Some(payload) = self.payload.take() {
            frames.push(decode_frame(payload));
        }
        frames
    }

    fn process_line(&mut self, line: &[u8], frames: &mut Vec<Frame>) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if line.is_empty() {
            if let Some(payload) = self.payload.take() {
                frames.push(decode_frame(payload));
            }
            return;
        }

        if let Some(rest) = line.strip_prefix(b"data:") {
            let rest = rest.strip_prefix(b" ").unwrap_or(rest);
            if let Some(previous) = self.payload.take() {
                frames.push(decode_frame(previous));
            }
            self.payload = Some(String::from_utf8_lossy(rest).into_owned());
        }
    }
}

/// Decode a complete body in one go.
pub fn decode_all(body: &[u8]) -> Vec<Frame> {
    let mut decoder = EventStreamDecoder::new();
    let mut frames = decoder.feed(body);
    frames.extend(decoder.finish());
    frames
}

fn decode_frame(payload: String) -> Frame {
    let value: Value = match serde_json::from_str(&payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Malformed event-stream frame, keeping raw payload");
            return Frame::Raw(payload);
        }
    };
    match parse_message(&value) {
        Ok(msg) => Frame::Message(msg),
        Err(e) => {
            warn!(error = %e.message, "Event-stream frame is not a JSON-RPC envelope");
            Frame::Raw(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::JsonRpcResponse;
    use serde_json::json;

    fn response(frame: &Frame) -> &JsonRpcResponse {
        match frame {
            Frame::Message(JsonRpcMessage::Response(resp)) => resp,
            other => panic!("expected response frame, got {:?}", other),
        }
    }

    #[test]
    fn two_frames_in_order() {
        let body = b"data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n\
                     data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{}}\n\n";
        let frames = decode_all(body);
        assert_eq!(frames.len(), 2);
        assert_eq!(response(&frames[0]).id, json!(1));
        assert_eq!(response(&frames[1]).id, json!(2));
    }

    #[test]
    fn malformed_frame_is_kept_raw() {
        let body = b"data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":1}\n\n\
                     data: {oops\n\n\
                     data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":2}\n\n";
        let frames = decode_all(body);
        assert_eq!(frames.len(), 3);
        assert_eq!(response(&frames[0]).id, json!(1));
        assert_eq!(frames[1], Frame::Raw("{oops".into()));
        assert_eq!(response(&frames[2]).id, json!(2));
    }

    #[test]
    fn json_that_is_not_an_envelope_is_raw() {
        let frames = decode_all(b"data: [1,2,3]\n\n");
        assert_eq!(frames, vec![Frame::Raw("[1,2,3]".into())]);
    }

    #[test]
    fn ignores_event_names_ids_and_comments() {
        let body = b": keep-alive\n\
                     event: message\r\n\
                     id: 17\r\n\
                     data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\r\n\r\n";
        let frames = decode_all(body);
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            Frame::Message(msg) => assert_eq!(msg.method(), Some("notifications/progress")),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn next_data_line_terminates_pending_frame() {
        let body = b"data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":1}\n\
                     data: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":2}\n";
        let frames = decode_all(body);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn survives_arbitrary_chunk_boundaries() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"text\":\"π ≈ 3.14\"}}\n\n";
        let mut decoder = EventStreamDecoder::new();
        let mut frames = Vec::new();
        for byte in body.as_bytes() {
            frames.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        frames.extend(decoder.finish());
        assert_eq!(frames.len(), 1);
        let result = response(&frames[0]).result.as_ref().unwrap();
        assert_eq!(result["text"], "π ≈ 3.14");
    }

    #[test]
    fn state_follows_data_lines() {
        let mut decoder = EventStreamDecoder::new();
        assert_eq!(decoder.state(), DecoderState::AwaitDataLine);
        assert!(decoder.feed(b"data: {}\n").is_empty());
        assert_eq!(decoder.state(), DecoderState::HavePayload);
        assert_eq!(decoder.feed(b"\n").len(), 1);
        assert_eq!(decoder.state(), DecoderState::AwaitDataLine);
    }

    #[test]
    fn finish_flushes_unterminated_payload() {
        let mut decoder = EventStreamDecoder::new();
        assert!(decoder
            .feed(b"data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":true}")
            .is_empty());
        let frames = decoder.finish();
        assert_eq!(frames.len(), 1);
        assert_eq!(response(&frames[0]).id, json!(4));
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert!(decode_all(b"").is_empty());
        assert!(decode_all(b"\n\n").is_empty());
    }
}
