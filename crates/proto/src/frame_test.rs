//! Tests for the tailpipe wire protocol

use super::*;
use bytes::Bytes;

fn roundtrip(frame: Frame) -> Frame {
    let encoded = frame.encode();

    // Skip length prefix (4 bytes)
    let payload = encoded.slice(4..);
    Frame::decode(payload).unwrap()
}

// ============================================================================
// Roundtrip tests
// ============================================================================

#[test]
fn test_register_roundtrip() {
    let frame = Frame::Register("web-01".into());
    assert_eq!(roundtrip(frame.clone()), frame);
}

#[test]
fn test_tail_roundtrip() {
    let frame = Frame::Tail(TailCall {
        token: "secret".into(),
        provider: "web-01".into(),
        path: "/var/log/syslog".into(),
        last_n: 100,
        follow: true,
    });
    assert_eq!(roundtrip(frame.clone()), frame);
}

#[test]
fn test_request_roundtrip() {
    let frame = Frame::Request(TailRequest {
        key: "8c0f3ad4-0a5e-4f2b-9f4a-0b1c2d3e4f50".into(),
        path: "/var/log/app.log".into(),
        last_n: 0,
        follow: false,
    });
    assert_eq!(roundtrip(frame.clone()), frame);
}

#[test]
fn test_line_roundtrip() {
    let frame = Frame::Line(Line::text("key-1", "alpha"));
    assert_eq!(roundtrip(frame.clone()), frame);

    let eof = Frame::Line(Line::eof("key-1"));
    assert_eq!(roundtrip(eof.clone()), eof);
}

#[test]
fn test_control_frames_roundtrip() {
    assert_eq!(roundtrip(Frame::End), Frame::End);
    assert_eq!(roundtrip(Frame::Heartbeat), Frame::Heartbeat);
    assert_eq!(
        roundtrip(Frame::Error("provider gone".into())),
        Frame::Error("provider gone".into())
    );
    assert_eq!(
        roundtrip(Frame::Cancel("key-1".into())),
        Frame::Cancel("key-1".into())
    );
}

#[test]
fn test_max_line_fits_in_frame() {
    // A full-length line with a UUID key must encode under the frame limit
    let key = "8c0f3ad4-0a5e-4f2b-9f4a-0b1c2d3e4f50";
    let frame = Frame::Line(Line::text(key, "x".repeat(crate::MAX_LINE_LEN)));
    let encoded = frame.encode();
    assert!(encoded.len() - 4 <= crate::MAX_FRAME_SIZE as usize);
}

#[test]
fn test_text_with_unicode() {
    let frame = Frame::Text("日本語 emoji 🎉".into());
    assert_eq!(roundtrip(frame.clone()), frame);
}

#[test]
fn test_empty_line_text() {
    // Blank lines in the tailed file still travel as frames
    let frame = Frame::Line(Line::text("k", ""));
    assert_eq!(roundtrip(frame.clone()), frame);
}

// ============================================================================
// Malformed input tests
// ============================================================================

#[test]
fn test_decode_empty_frame() {
    let result = Frame::decode(Bytes::new());
    assert!(matches!(result, Err(ProtoError::Malformed(_))));
}

#[test]
fn test_decode_unknown_tag() {
    let result = Frame::decode(Bytes::from_static(&[0xff]));
    assert!(matches!(result, Err(ProtoError::Malformed(_))));
}

#[test]
fn test_decode_truncated_string() {
    // Register tag, string claims 10 bytes but only 3 present
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&10u32.to_be_bytes());
    bytes.extend_from_slice(b"abc");

    let result = Frame::decode(Bytes::from(bytes));
    assert!(matches!(result, Err(ProtoError::Malformed(_))));
}

#[test]
fn test_decode_truncated_line() {
    // Line tag with key but missing text and eof flag
    let mut bytes = vec![0x04];
    bytes.extend_from_slice(&3u32.to_be_bytes());
    bytes.extend_from_slice(b"key");

    let result = Frame::decode(Bytes::from(bytes));
    assert!(matches!(result, Err(ProtoError::Malformed(_))));
}

#[test]
fn test_decode_invalid_utf8() {
    let mut bytes = vec![0x05];
    bytes.extend_from_slice(&2u32.to_be_bytes());
    bytes.extend_from_slice(&[0xc3, 0x28]);

    let result = Frame::decode(Bytes::from(bytes));
    assert!(matches!(result, Err(ProtoError::Malformed(_))));
}

// ============================================================================
// Length prefix tests
// ============================================================================

#[test]
fn test_length_prefix_matches_payload() {
    let frame = Frame::Text("hello".into());
    let encoded = frame.encode();

    let len = u32::from_be_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]) as usize;
    assert_eq!(len, encoded.len() - 4);
}

#[test]
fn test_frame_kind_names() {
    assert_eq!(Frame::End.kind(), "end");
    assert_eq!(Frame::Heartbeat.kind(), "heartbeat");
    assert_eq!(Frame::Register("x".into()).kind(), "register");
}
