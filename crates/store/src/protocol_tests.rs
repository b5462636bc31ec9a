// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use crate::script::Script;

#[test]
fn encode_decode_roundtrip_request() {
    let request = Request::Execute {
        command: Command::Eval {
            script: Script::Notify {
                list: "cumulus:cond:1:waiters".to_string(),
                count: 3,
                signal: b"1".to_vec(),
            },
        },
    };

    let encoded = encode(&request).expect("encode failed");
    let decoded: Request = decode(&encoded).expect("decode failed");

    assert_eq!(request, decoded);
}

#[test]
fn encode_decode_failure_response() {
    let response = Response::Failed {
        failure: Failure::IndexOutOfRange {
            key: "l".to_string(),
            index: 9,
        },
    };

    let encoded = encode(&response).expect("encode failed");
    let decoded: Response = decode(&encoded).expect("decode failed");

    assert_eq!(response, decoded);
}

#[test]
fn blocking_pop_timeout_survives_encoding() {
    let request = Request::Execute {
        command: Command::BLPop {
            keys: vec!["a".to_string()],
            timeout: Some(Duration::from_millis(1500)),
        },
    };

    let decoded: Request = decode(&encode(&request).expect("encode failed")).expect("decode failed");
    assert_eq!(request, decoded);
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Reply { reply: Reply::Ok };
    let encoded = encode(&response).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original)
        .await
        .expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, &[0u8; 64])
        .await
        .expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message_limited(&mut cursor, 16).await.unwrap_err();

    assert!(matches!(
        err,
        ProtocolError::MessageTooLarge { size: 64, max: 16 }
    ));
}

#[tokio::test]
async fn eof_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(vec![0u8, 0]);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn request_read_times_out() {
    let (mut client, _server) = tokio::io::duplex(64);
    let err = read_request(&mut client, Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}
