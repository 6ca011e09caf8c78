//! Async stream log readers (non-UTF8-safe).
//!
//! The server can emit non-UTF8 bytes on stdout/stderr. Using
//! `BufReader::lines()` would terminate the reader task on invalid UTF-8, so
//! lines are read as bytes and decoded lossily.

use std::sync::Arc;

use lmhost_core::ports::ServerLogSinkPort;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

pub fn spawn_stream_reader(
    stream: impl AsyncRead + Unpin + Send + 'static,
    stream_type: &'static str,
    sink: Option<Arc<dyn ServerLogSinkPort>>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    // Trim trailing newline(s)
                    if buf.last() == Some(&b'\n') {
                        buf.pop();
                        if buf.last() == Some(&b'\r') {
                            buf.pop();
                        }
                    }

                    let line = String::from_utf8_lossy(&buf).to_string();
                    debug!(%stream_type, "server {}: {}", stream_type, line);
                    if let Some(ref s) = sink {
                        s.append(stream_type, line);
                    }
                }
                Err(e) => {
                    debug!(%stream_type, error = %e, "log stream reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(%stream_type, "log stream reader task exiting");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<(String, String)>>);

    impl ServerLogSinkPort for Collect {
        fn append(&self, stream_type: &str, line: String) {
            self.0.lock().unwrap().push((stream_type.to_string(), line));
        }
    }

    #[tokio::test]
    async fn test_reader_forwards_lossy_lines() {
        let sink = Arc::new(Collect::default());
        let input: &'static [u8] = b"listening on 127.0.0.1\r\nbad \xff byte\nlast";
        spawn_stream_reader(input, "stderr", Some(sink.clone()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let lines = sink.0.lock().unwrap().clone();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ("stderr".into(), "listening on 127.0.0.1".into()));
        assert!(lines[1].1.starts_with("bad "));
        assert_eq!(lines[2].1, "last");
    }
}
