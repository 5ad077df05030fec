//! Append-only chat transcript.
//!
//! Every inbound command line is stamped and appended to a log file. A
//! single writer task owns the file handle, so concurrent connections can
//! never interleave within one line. Failures are traced and swallowed;
//! the client path never sees them.

use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct TranscriptSink {
    tx: mpsc::UnboundedSender<String>,
}

impl TranscriptSink {
    /// Spawn the writer task for `path` and return a cheap-clone handle.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_loop(path, rx));
        Self { tx }
    }

    /// Queue one inbound line for the transcript. Stamped at receipt
    /// time, not at write time.
    pub fn record(&self, line: &str) {
        let _ = self.tx.send(stamp(line));
    }
}

fn stamp(line: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
    format!("[{timestamp}] {line}\n")
}

async fn writer_loop(path: PathBuf, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(
                path = %path.display(),
                error = %err,
                "cannot open transcript, lines will be dropped"
            );
            while rx.recv().await.is_some() {}
            return;
        }
    };

    while let Some(entry) = rx.recv().await {
        if let Err(err) = file.write_all(entry.as_bytes()).await {
            tracing::error!(error = %err, "transcript append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn stamp_brackets_the_timestamp_and_terminates_the_line() {
        let entry = stamp("NICK alice");
        assert!(entry.starts_with('['));
        assert!(entry.contains("] NICK alice"));
        assert!(entry.ends_with('\n'));
    }

    #[tokio::test]
    async fn lines_reach_the_file_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");

        let sink = TranscriptSink::spawn(path.clone());
        sink.record("NICK alice");
        sink.record("MSG hi");
        drop(sink);

        let mut content = String::new();
        for _ in 0..100 {
            content = tokio::fs::read_to_string(&path).await.unwrap_or_default();
            if content.lines().count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] NICK alice"));
        assert!(lines[1].ends_with("] MSG hi"));
    }
}
