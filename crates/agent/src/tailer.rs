//! File tailer - serves one tail request
//!
//! Sequential reader that streams a file's lines into the agent's outbound
//! queue, each tagged with the request's correlation key, and terminates
//! the sequence with exactly one EOF marker. Supports last-N windows and a
//! follow mode that polls for appended data until cancelled. Lines longer
//! than one frame can carry are split across frames rather than rejected.
//!
//! Failures are reported in-band: an error line followed by the EOF marker,
//! so the waiting consumer call always terminates.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tailpipe_proto::{Line, MAX_LINE_LEN, TailRequest};

/// Serve one tail request, always ending with the EOF marker
pub async fn tail_file(
    request: TailRequest,
    lines: mpsc::Sender<Line>,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    if let Err(e) = run(&request, &lines, &cancel, poll_interval).await {
        warn!(path = %request.path, error = %e, "tail failed");
        let _ = lines
            .send(Line::text(
                &request.key,
                format!("tail {}: {e}", request.path),
            ))
            .await;
    }
    let _ = lines.send(Line::eof(&request.key)).await;
    debug!(path = %request.path, key = %request.key, "tail finished");
}

async fn run(
    request: &TailRequest,
    lines: &mpsc::Sender<Line>,
    cancel: &CancellationToken,
    poll_interval: Duration,
) -> io::Result<()> {
    let file = File::open(&request.path).await?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();
    // Carries a partially written final line across reads
    let mut pending = String::new();

    // Initial pass over the existing content
    let mut window: VecDeque<String> = VecDeque::new();
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }
        buf.clear();
        if reader.read_line(&mut buf).await? == 0 {
            break;
        }
        pending.push_str(&buf);
        if pending.ends_with('\n') {
            let text = trim_newline(&pending).to_string();
            pending.clear();
            if !emit(request, lines, &mut window, text).await {
                return Ok(());
            }
        }
    }

    // In follow mode an unterminated final line stays pending until the
    // writer finishes it; otherwise it is the last line
    if !request.follow && !pending.is_empty() {
        let text = trim_newline(&pending).to_string();
        if !emit(request, lines, &mut window, text).await {
            return Ok(());
        }
    }

    // Flush the last-N window
    for text in window {
        if !send_text(&request.key, lines, &text).await {
            return Ok(());
        }
    }

    if !request.follow {
        return Ok(());
    }

    // Follow: poll for appended data until cancelled
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(poll_interval) => {}
        }
        loop {
            buf.clear();
            if reader.read_line(&mut buf).await? == 0 {
                break;
            }
            pending.push_str(&buf);
            if pending.ends_with('\n') {
                let text = trim_newline(&pending).to_string();
                pending.clear();
                if !send_text(&request.key, lines, &text).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Route one complete line either into the last-N window or straight out
///
/// Returns false when the receiver is gone and tailing should stop.
async fn emit(
    request: &TailRequest,
    lines: &mpsc::Sender<Line>,
    window: &mut VecDeque<String>,
    text: String,
) -> bool {
    if request.last_n > 0 {
        if window.len() == request.last_n as usize {
            window.pop_front();
        }
        window.push_back(text);
        true
    } else {
        send_text(&request.key, lines, &text).await
    }
}

/// Send one logical line, split into frame-sized pieces when oversized
///
/// A single pathological line must never produce a frame the relay would
/// reject. Returns false when the receiver is gone.
async fn send_text(key: &str, lines: &mpsc::Sender<Line>, text: &str) -> bool {
    let mut rest = text;
    loop {
        let (piece, tail) = split_at_boundary(rest, MAX_LINE_LEN);
        if lines.send(Line::text(key, piece)).await.is_err() {
            return false;
        }
        if tail.is_empty() {
            return true;
        }
        rest = tail;
    }
}

/// Split at `max` bytes, backing up to the nearest char boundary
fn split_at_boundary(s: &str, max: usize) -> (&str, &str) {
    if s.len() <= max {
        return (s, "");
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.split_at(end)
}

fn trim_newline(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

#[cfg(test)]
#[path = "tailer_test.rs"]
mod tests;
