//! Shared SSE streaming infrastructure for the vendor adapters.
//!
//! Both wire formats in play (OpenAI-compatible and Anthropic Messages)
//! stream as server-sent events: chunked bytes, events split on `\n\n`,
//! payloads on `data:` lines. This module owns the buffering and
//! draining; each adapter supplies a parser closure that turns one
//! payload into zero or more [`StreamChunk`]s.

use da_domain::error::{ProviderType, Result};
use da_domain::stream::{BoxStream, FinishReason, StreamChunk};

use crate::classify::from_reqwest;

/// Pull every complete `data:` payload out of the buffer.
///
/// Consumed bytes are removed in place; a trailing partial event stays
/// for the next call. `event:`, `id:`, and `retry:` lines are skipped.
pub(crate) fn drain_data_payloads(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let event: String = buffer.drain(..pos + 2).collect();
        for line in event.lines() {
            if let Some(data) = line.trim().strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    payloads.push(data.to_string());
                }
            }
        }
    }

    payloads
}

/// Build a chunk stream from an SSE `reqwest::Response` plus a
/// payload parser.
///
/// The parser is `FnMut` so adapters can keep assembly state across
/// payloads (the Anthropic adapter tracks usage between events). The
/// stream flushes any trailing partial event when the body closes and
/// guarantees a terminating [`StreamChunk::Done`] even when the vendor
/// never sent one.
pub(crate) fn chunk_stream<F>(
    provider: ProviderType,
    response: reqwest::Response,
    mut parse: F,
) -> BoxStream<'static, Result<StreamChunk>>
where
    F: FnMut(&str) -> Vec<Result<StreamChunk>> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut response = response;
        let mut buffer = String::new();
        let mut done_emitted = false;

        loop {
            match response.chunk().await {
                Ok(Some(bytes)) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    for payload in drain_data_payloads(&mut buffer) {
                        for chunk in parse(&payload) {
                            if matches!(&chunk, Ok(StreamChunk::Done { .. })) {
                                done_emitted = true;
                            }
                            yield chunk;
                        }
                    }
                }
                Ok(None) => {
                    // Body closed; flush a trailing partial event if any.
                    if !buffer.trim().is_empty() {
                        buffer.push_str("\n\n");
                        for payload in drain_data_payloads(&mut buffer) {
                            for chunk in parse(&payload) {
                                if matches!(&chunk, Ok(StreamChunk::Done { .. })) {
                                    done_emitted = true;
                                }
                                yield chunk;
                            }
                        }
                    }
                    break;
                }
                Err(e) => {
                    yield Err(from_reqwest(provider, e).into());
                    break;
                }
            }
        }

        if !done_emitted {
            yield Ok(StreamChunk::Done {
                finish_reason: FinishReason::Stop,
                usage: None,
            });
        }
    };

    Box::pin(stream)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_one_complete_event() {
        let mut buf = String::from("event: delta\ndata: {\"a\":1}\n\n");
        assert_eq!(drain_data_payloads(&mut buf), vec!["{\"a\":1}"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drains_multiple_events_in_order() {
        let mut buf = String::from("data: one\n\ndata: two\n\ndata: three\n\n");
        assert_eq!(drain_data_payloads(&mut buf), vec!["one", "two", "three"]);
    }

    #[test]
    fn keeps_partial_event_buffered() {
        let mut buf = String::from("data: whole\n\ndata: par");
        assert_eq!(drain_data_payloads(&mut buf), vec!["whole"]);
        assert_eq!(buf, "data: par");

        buf.push_str("tial\n\n");
        assert_eq!(drain_data_payloads(&mut buf), vec!["partial"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn skips_non_data_and_empty_lines() {
        let mut buf = String::from("event: ping\nid: 9\nretry: 100\ndata: x\n\ndata: \n\n");
        assert_eq!(drain_data_payloads(&mut buf), vec!["x"]);
    }

    #[test]
    fn done_sentinel_passes_through_verbatim() {
        let mut buf = String::from("data: [DONE]\n\n");
        assert_eq!(drain_data_payloads(&mut buf), vec!["[DONE]"]);
    }
}
