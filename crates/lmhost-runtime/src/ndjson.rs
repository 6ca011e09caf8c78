//! Newline-delimited JSON decoding for streamed server responses.
//!
//! Both the streamed pull and streamed generate endpoints answer with one
//! JSON object per line. This module turns a raw byte stream into a stream
//! of typed events, and provides a cancellation-aware `next_step` so the
//! pull and generate loops share the same plumbing.

use std::fmt::Display;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Errors surfaced by [`decode_ndjson`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NdjsonError {
    /// The underlying transfer failed; the stream ends after this item.
    #[error("stream transport error: {0}")]
    Transport(String),

    /// A line was not valid JSON for the expected type; decoding continues.
    #[error("malformed stream line {line:?}: {message}")]
    Decode { line: String, message: String },
}

/// Outcome of waiting for the next stream item.
#[derive(Debug)]
pub enum StreamStep<T> {
    Item(T),
    End,
    Cancelled,
}

struct DecodeState<S> {
    stream: Pin<Box<S>>,
    buf: BytesMut,
    done: bool,
}

/// Decode a byte stream into one `T` per non-empty line.
///
/// A trailing line without a final newline is still decoded at end of
/// stream. After a transport error the stream yields that error and ends.
pub fn decode_ndjson<T, S, E>(byte_stream: S) -> impl Stream<Item = Result<T, NdjsonError>>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let state = DecodeState {
        stream: Box::pin(byte_stream),
        buf: BytesMut::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }

        loop {
            if let Some(line_end) = st.buf.iter().position(|b| *b == b'\n') {
                let line = st.buf.split_to(line_end + 1);
                if let Some(item) = parse_line(&line) {
                    return Some((item, st));
                }
                continue;
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    debug!(error = %e, "NDJSON transport error");
                    st.done = true;
                    return Some((Err(NdjsonError::Transport(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    let rest = st.buf.split();
                    return parse_line(&rest).map(|item| (item, st));
                }
            }
        }
    })
}

fn parse_line<T: DeserializeOwned>(raw: &[u8]) -> Option<Result<T, NdjsonError>> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(
        serde_json::from_str(trimmed).map_err(|e| NdjsonError::Decode {
            line: trimmed.to_string(),
            message: e.to_string(),
        }),
    )
}

/// Wait for the next item, or for `cancel` to fire.
///
/// Cancellation wins when both are ready, so a cancelled transfer never
/// processes one more event.
pub async fn next_step<S>(stream: &mut S, cancel: Option<&CancellationToken>) -> StreamStep<S::Item>
where
    S: Stream + Unpin,
{
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        () = cancelled => StreamStep::Cancelled,
        item = stream.next() => match item {
            Some(item) => StreamStep::Item(item),
            None => StreamStep::End,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Event {
        n: u32,
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, String>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let events: Vec<_> = decode_ndjson::<Event, _, _>(chunks(&["{\"n\":1}\n{\"n\"", ":2}\n\n{\"n\":3}"]))
            .collect()
            .await;
        assert_eq!(
            events,
            vec![Ok(Event { n: 1 }), Ok(Event { n: 2 }), Ok(Event { n: 3 })]
        );
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_end_stream() {
        let events: Vec<_> = decode_ndjson::<Event, _, _>(chunks(&["nope\n{\"n\":7}\n"]))
            .collect()
            .await;
        assert!(matches!(events[0], Err(NdjsonError::Decode { .. })));
        assert_eq!(events[1], Ok(Event { n: 7 }));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"n\":1}\n")),
            Err("reset".to_string()),
            Ok(Bytes::from_static(b"{\"n\":2}\n")),
        ]);
        let events: Vec<_> = decode_ndjson::<Event, _, _>(source).collect().await;
        assert_eq!(
            events,
            vec![
                Ok(Event { n: 1 }),
                Err(NdjsonError::Transport("reset".into()))
            ]
        );
    }

    #[tokio::test]
    async fn test_next_step_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let mut events = Box::pin(decode_ndjson::<Event, _, _>(chunks(&["{\"n\":1}\n"])));
        assert!(matches!(
            next_step(&mut events, Some(&token)).await,
            StreamStep::Cancelled
        ));
    }

    #[tokio::test]
    async fn test_next_step_without_token_reaches_end() {
        let mut events = Box::pin(decode_ndjson::<Event, _, _>(chunks(&["{\"n\":1}\n"])));
        assert!(matches!(
            next_step(&mut events, None).await,
            StreamStep::Item(Ok(Event { n: 1 }))
        ));
        assert!(matches!(next_step(&mut events, None).await, StreamStep::End));
    }
}
