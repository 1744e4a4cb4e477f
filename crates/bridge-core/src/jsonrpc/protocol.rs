//! JSON-RPC 2.0 envelope types and reply decoding.
//!
//! The SPDK JSON-RPC server speaks unframed JSON over a byte stream: one
//! request object goes out, one response object comes back. Replies are
//! decoded incrementally so the client can stop reading as soon as a complete
//! value has arrived, whether or not the backend closes its side.
//!
//! ```text
//! -> {"jsonrpc":"2.0","id":1,"method":"spdk_get_version"}
//! <- {"jsonrpc":"2.0","id":1,"result":{"version":"SPDK v23.01"}}
//! ```

use crate::config::BackendConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// JSON-RPC 2.0 request sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request. A `null` params value is omitted from the wire.
    pub fn new(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: BackendConfig::JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params: if params.is_null() { None } else { Some(params) },
        }
    }
}

/// JSON-RPC 2.0 response received from the backend.
///
/// `result` stays an untyped [`Value`] until the caller decides which shape
/// it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
    #[serde(default)]
    pub result: Value,
}

impl JsonRpcResponse {
    /// The backend error, if the response reports one. A zero code means success.
    pub fn failure(&self) -> Option<&JsonRpcErrorObject> {
        self.error.as_ref().filter(|e| e.code != 0)
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Why a reply could not be read off the stream.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before any byte arrived.
    #[error("EOF")]
    Eof,

    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("response exceeds maximum size of {limit} bytes")]
    TooLarge { limit: usize },
}

/// Tracks container nesting as bytes arrive so a reply is decoded once, when
/// its top-level object or array has closed.
#[derive(Debug, Default)]
struct ValueBoundary {
    depth: usize,
    opened: bool,
    in_string: bool,
    escaped: bool,
    /// The top-level value is not a container; decode after every chunk.
    eager: bool,
}

impl ValueBoundary {
    /// Scan `bytes`; returns the offset just past the closing bracket of the
    /// top-level container if it is in this slice.
    fn feed(&mut self, bytes: &[u8]) -> Option<usize> {
        for (i, &b) in bytes.iter().enumerate() {
            if self.eager {
                return None;
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match b {
                b'{' | b'[' => {
                    self.opened = true;
                    self.depth += 1;
                }
                b'}' | b']' if self.opened => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        return Some(i + 1);
                    }
                }
                b'"' if self.opened => self.in_string = true,
                b if b.is_ascii_whitespace() => {}
                _ if !self.opened => self.eager = true,
                _ => {}
            }
        }
        None
    }
}

/// Read exactly one JSON value of type `T` from `reader`.
///
/// Bytes are accumulated in chunks. For an object or array the decode runs
/// once, when its closing bracket arrives; any trailing bytes are ignored.
pub async fn read_message<T, R>(reader: &mut R, limit: usize) -> Result<T, ReadError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(BackendConfig::READ_CHUNK_SIZE);
    let mut chunk = vec![0u8; BackendConfig::READ_CHUNK_SIZE];
    let mut boundary = ValueBoundary::default();

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buf.iter().all(u8::is_ascii_whitespace) {
                return Err(ReadError::Eof);
            }
            // Surfaces the decoder's own end-of-input error.
            return serde_json::from_slice(&buf).map_err(ReadError::Decode);
        }

        if buf.len() + n > limit {
            return Err(ReadError::TooLarge { limit });
        }
        let start = buf.len();
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = boundary.feed(&buf[start..]) {
            return serde_json::from_slice(&buf[..start + end]).map_err(ReadError::Decode);
        }
        if boundary.eager {
            let mut values = serde_json::Deserializer::from_slice(&buf).into_iter::<T>();
            match values.next() {
                Some(Ok(value)) => return Ok(value),
                Some(Err(e)) if e.is_eof() => continue,
                Some(Err(e)) => return Err(ReadError::Decode(e)),
                None => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_null_params() {
        let req = JsonRpcRequest::new("spdk_get_version", Value::Null, 1);
        let text = serde_json::to_string(&req).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":1,"method":"spdk_get_version"}"#);
    }

    #[test]
    fn test_request_carries_params() {
        let req = JsonRpcRequest::new("bdev_crypto_delete", json!({"name": "crypto0"}), 7);
        let text = serde_json::to_string(&req).unwrap();
        assert!(text.contains(r#""params":{"name":"crypto0"}"#));
        assert!(text.contains(r#""id":7"#));
    }

    #[test]
    fn test_zero_code_is_success() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"id":1,"error":{"code":0},"result":true}"#).unwrap();
        assert!(resp.failure().is_none());
        assert_eq!(resp.result, json!(true));
    }

    #[test]
    fn test_nonzero_code_is_failure() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"id":1,"error":{"code":-32602,"message":"Invalid parameters"}}"#,
        )
        .unwrap();
        let err = resp.failure().unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid parameters");
        assert!(resp.result.is_null());
    }

    #[tokio::test]
    async fn test_read_message_empty_stream_is_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_message::<JsonRpcResponse, _>(&mut cursor, 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Eof));
        assert_eq!(err.to_string(), "EOF");
    }

    #[tokio::test]
    async fn test_read_message_truncated_stream_is_decode_eof() {
        let mut cursor = std::io::Cursor::new(br#"{"id":1,"result":"#.to_vec());
        let err = read_message::<JsonRpcResponse, _>(&mut cursor, 1024)
            .await
            .unwrap_err();
        match err {
            ReadError::Decode(e) => assert!(e.is_eof()),
            other => panic!("Expected Decode, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_message_stops_at_first_value() {
        let mut cursor =
            std::io::Cursor::new(br#"{"id":3,"result":22}{"id":4,"result":23}"#.to_vec());
        let resp: JsonRpcResponse = read_message(&mut cursor, 1024).await.unwrap();
        assert_eq!(resp.id, Some(3));
        assert_eq!(resp.result, json!(22));
    }

    #[tokio::test]
    async fn test_read_message_across_chunks() {
        // Larger than one read chunk so the decoder must resume.
        let name = "x".repeat(BackendConfig::READ_CHUNK_SIZE * 2);
        let payload = serde_json::to_vec(&json!({"id": 9, "result": name})).unwrap();
        let mut cursor = std::io::Cursor::new(payload);
        let resp: JsonRpcResponse = read_message(&mut cursor, usize::MAX).await.unwrap();
        assert_eq!(resp.id, Some(9));
        assert_eq!(resp.result.as_str().map(str::len), Some(name.len()));
    }

    #[tokio::test]
    async fn test_read_message_ignores_brackets_inside_strings() {
        let mut cursor = std::io::Cursor::new(
            br#"{"id":5,"result":"a \"}\" ] {"}trailing garbage"#.to_vec(),
        );
        let resp: JsonRpcResponse = read_message(&mut cursor, 1024).await.unwrap();
        assert_eq!(resp.id, Some(5));
        assert_eq!(resp.result, json!(r#"a "}" ] {"#));
    }

    #[tokio::test]
    async fn test_read_message_scalar_value() {
        let mut cursor = std::io::Cursor::new(b"  true".to_vec());
        let value: bool = read_message(&mut cursor, 1024).await.unwrap();
        assert!(value);
    }

    #[tokio::test]
    async fn test_read_message_large_reply_is_linear() {
        // A few MiB of iostat entries, as an unfiltered bdev_get_iostat returns.
        let bdevs: Vec<Value> = (0..40_000)
            .map(|i| {
                json!({
                    "name": format!("Malloc{}", i),
                    "bytes_read": i,
                    "num_read_ops": i,
                    "bytes_written": i,
                    "num_write_ops": i,
                    "read_latency_ticks": i,
                    "write_latency_ticks": i
                })
            })
            .collect();
        let payload =
            serde_json::to_vec(&json!({"id": 2, "result": {"tick_rate": 1, "bdevs": bdevs}}))
                .unwrap();
        assert!(payload.len() > 4 * 1024 * 1024);

        let mut cursor = std::io::Cursor::new(payload);
        let started = std::time::Instant::now();
        let resp: JsonRpcResponse = read_message(&mut cursor, BackendConfig::MAX_RESPONSE_SIZE)
            .await
            .unwrap();
        assert!(
            started.elapsed() < std::time::Duration::from_secs(5),
            "decode took {:?}",
            started.elapsed()
        );
        assert_eq!(resp.id, Some(2));
        assert_eq!(resp.result["bdevs"].as_array().map(Vec::len), Some(40_000));
    }

    #[tokio::test]
    async fn test_read_message_oversized_returns_error() {
        let payload = serde_json::to_vec(&json!({"id": 1, "result": "y".repeat(64)})).unwrap();
        let mut cursor = std::io::Cursor::new(payload);
        let err = read_message::<JsonRpcResponse, _>(&mut cursor, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::TooLarge { limit: 16 }));
    }
}
