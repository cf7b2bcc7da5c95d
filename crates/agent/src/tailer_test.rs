//! Tests for the file tailer

use super::*;

use std::io::Write;
use tempfile::NamedTempFile;
use tokio::time::timeout;

const POLL: Duration = Duration::from_millis(20);

fn request(path: &str, last_n: u32, follow: bool) -> TailRequest {
    TailRequest {
        key: "test-key".into(),
        path: path.into(),
        last_n,
        follow,
    }
}

fn temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Run a non-follow tail to completion and collect the line texts
async fn collect(request: TailRequest) -> Vec<Line> {
    let (tx, mut rx) = mpsc::channel(64);
    tail_file(request, tx, CancellationToken::new(), POLL).await;

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }
    lines
}

#[tokio::test]
async fn test_whole_file() {
    let file = temp_file("alpha\nbeta\ngamma\n");
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    assert!(lines.last().unwrap().eof);
    assert_eq!(lines.iter().filter(|l| l.eof).count(), 1);
}

#[tokio::test]
async fn test_lines_tagged_with_key() {
    let file = temp_file("alpha\n");
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    assert!(lines.iter().all(|l| l.key == "test-key"));
}

#[tokio::test]
async fn test_last_n_window() {
    let file = temp_file("one\ntwo\nthree\nfour\nfive\n");
    let lines = collect(request(file.path().to_str().unwrap(), 2, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["four", "five"]);
}

#[tokio::test]
async fn test_last_n_larger_than_file() {
    let file = temp_file("one\ntwo\n");
    let lines = collect(request(file.path().to_str().unwrap(), 10, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn test_missing_newline_at_eof() {
    let file = temp_file("alpha\nbeta");
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_crlf_line_endings() {
    let file = temp_file("alpha\r\nbeta\r\n");
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn test_missing_file_reports_error_then_eof() {
    let lines = collect(request("/nonexistent/nope.log", 0, false)).await;

    assert_eq!(lines.len(), 2);
    assert!(lines[0].text.contains("/nonexistent/nope.log"));
    assert!(lines[1].eof);
}

#[tokio::test]
async fn test_follow_picks_up_appended_lines() {
    let mut file = temp_file("first\n");
    let path = file.path().to_str().unwrap().to_string();

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let tail = tokio::spawn(tail_file(request(&path, 0, true), tx, cancel.clone(), POLL));

    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.text, "first");

    file.write_all(b"second\n").unwrap();
    file.flush().unwrap();

    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.text, "second");

    cancel.cancel();
    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert!(line.eof);
    tail.await.unwrap();
}

#[tokio::test]
async fn test_follow_waits_for_complete_line() {
    let mut file = temp_file("first\n");
    let path = file.path().to_str().unwrap().to_string();

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let tail = tokio::spawn(tail_file(request(&path, 0, true), tx, cancel.clone(), POLL));

    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.text, "first");

    // A half-written line must not be emitted yet
    file.write_all(b"par").unwrap();
    file.flush().unwrap();
    tokio::time::sleep(POLL * 4).await;
    assert!(rx.try_recv().is_err());

    file.write_all(b"tial\n").unwrap();
    file.flush().unwrap();
    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.text, "partial");

    cancel.cancel();
    tail.await.unwrap();
}

#[tokio::test]
async fn test_oversized_line_split_across_frames() {
    // One pathological line (minified JSON, say) must not produce a frame
    // the relay would reject and must survive intact after splitting
    let long = "x".repeat(2 * 1024 * 1024);
    let file = temp_file(&format!("{long}\nshort\n"));
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert!(texts.len() > 2);
    assert!(texts.iter().all(|t| t.len() <= MAX_LINE_LEN));
    assert_eq!(texts.last().unwrap(), &"short");
    assert_eq!(texts[..texts.len() - 1].concat(), long);
    assert_eq!(lines.iter().filter(|l| l.eof).count(), 1);
}

#[tokio::test]
async fn test_oversized_line_splits_on_char_boundary() {
    // Multi-byte characters straddling the split point must stay whole
    let long = "é".repeat(MAX_LINE_LEN);
    let file = temp_file(&format!("{long}\n"));
    let lines = collect(request(file.path().to_str().unwrap(), 0, false)).await;

    let texts: Vec<_> = lines.iter().filter(|l| !l.eof).map(|l| l.text.as_str()).collect();
    assert!(texts.len() > 1);
    assert!(texts.iter().all(|t| t.len() <= MAX_LINE_LEN));
    assert_eq!(texts.concat(), long);
}

#[tokio::test]
async fn test_cancel_stops_follow_tail() {
    let mut file = temp_file("first\n");
    let path = file.path().to_str().unwrap().to_string();

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let tail = tokio::spawn(tail_file(request(&path, 0, true), tx, cancel.clone(), POLL));

    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(line.text, "first");

    // An abandoned follow tail must stop at the cancel, not poll forever
    cancel.cancel();
    let line = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert!(line.eof);
    tail.await.unwrap();

    // Data appended afterwards is never read
    file.write_all(b"second\n").unwrap();
    file.flush().unwrap();
    tokio::time::sleep(POLL * 4).await;
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_consumer_gone_stops_quietly() {
    let file = temp_file("alpha\nbeta\n");
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    // Must return, not hang or panic
    timeout(
        Duration::from_secs(1),
        tail_file(
            request(file.path().to_str().unwrap(), 0, false),
            tx,
            CancellationToken::new(),
            POLL,
        ),
    )
    .await
    .unwrap();
}
