//! Line-delimited JSON stream decoding.
//!
//! A chat response body is one JSON object per line. Lines are decoded
//! independently: a malformed line is reported as [`StreamEvent::Skipped`] and
//! decoding carries on. The stream ends when the input ends; no terminator
//! frame is required.

use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tokio_stream::Stream;

use crate::error::Result;
use crate::types::Usage;

/// Events produced while decoding a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty content chunk, in wire order
    Delta(String),
    /// A line that could not be used; never fatal
    Skipped { line: usize, reason: String },
    /// Final frame with generation statistics
    Finished(Usage),
}

/// A stream of decoded events. Transport failures while reading end it with `Err`.
pub type StreamEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Only `message.content` must be well-formed; a side field of an unexpected
/// type reads as absent.
#[derive(Debug, Deserialize)]
struct Frame {
    message: Option<FrameMessage>,
    #[serde(default, deserialize_with = "lenient")]
    done: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    done_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    prompt_eval_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    eval_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    error: Option<String>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

#[derive(Debug, Deserialize)]
struct FrameMessage {
    content: Option<String>,
}

/// Decode one line into zero, one or two events.
///
/// Blank and content-free lines yield nothing. A final frame that also carries
/// content yields the `Delta` followed by `Finished`.
pub fn decode_line(raw: &[u8], line: usize) -> Vec<StreamEvent> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text.trim(),
        Err(e) => {
            return vec![StreamEvent::Skipped {
                line,
                reason: format!("invalid UTF-8: {}", e),
            }];
        }
    };
    if text.is_empty() {
        return Vec::new();
    }

    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            return vec![StreamEvent::Skipped {
                line,
                reason: e.to_string(),
            }];
        }
    };

    if let Some(error) = frame.error {
        return vec![StreamEvent::Skipped {
            line,
            reason: format!("server error frame: {}", error),
        }];
    }

    let mut events = Vec::new();
    match frame.message.and_then(|m| m.content) {
        Some(content) if !content.is_empty() => events.push(StreamEvent::Delta(content)),
        _ => {}
    }

    if frame.done == Some(true) {
        events.push(StreamEvent::Finished(Usage {
            prompt_tokens: frame.prompt_eval_count.unwrap_or(0),
            completion_tokens: frame.eval_count.unwrap_or(0),
            done_reason: frame.done_reason,
        }));
    }

    events
}

/// Split a byte stream into lines and decode each one.
///
/// Chunk boundaries are arbitrary: a line (or a UTF-8 sequence) may span
/// several chunks. A trailing line without a newline is decoded at end of input.
pub fn decode_lines<S, B>(bytes: S) -> StreamEventStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    Box::pin(stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        let mut line = 0usize;

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                line += 1;
                for event in decode_line(&raw[..pos], line) {
                    yield Ok(event);
                }
            }
        }

        if !buffer.is_empty() {
            line += 1;
            for event in decode_line(&buffer, line) {
                yield Ok(event);
            }
        }
    })
}
