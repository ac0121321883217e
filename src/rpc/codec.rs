//! RPC wire codec.
//!
//! Frames are a 4-byte big-endian length prefix followed by a JSON document:
//!
//! ```text
//! [4-byte length] [JSON data]
//! ```
//!
//! Call frame:
//! ```text
//! {"seq": 1, "method": "GetInfo", "args": [{"@struct": "ncTGetInfoParam", "fields": {...}}, 3]}
//! ```
//!
//! Reply frame, one of:
//! ```text
//! {"seq": 1, "result": <json>}
//! {"seq": 1, "exception": {"type": "ncTException", "attrs": {"expMsg": "...", "errID": 5}}}
//! {"seq": 1, "error": {"message": "unknown method"}}
//! ```

use serde_json::{json, Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::rpc::error::RpcError;
use crate::rpc::marshal::CallArgument;

/// Largest frame accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Key marking a struct argument on the wire.
pub const STRUCT_TAG: &str = "@struct";

/// Encode one call argument in its wire form.
pub fn encode_argument(arg: &CallArgument) -> Value {
    match arg {
        CallArgument::Scalar(value) => value.clone(),
        CallArgument::Sequence(items) => Value::Array(items.iter().map(encode_argument).collect()),
        CallArgument::Struct { type_name, fields } => {
            let fields: Map<String, Value> = fields
                .iter()
                .map(|(name, value)| (name.clone(), encode_argument(value)))
                .collect();
            let mut wire = Map::new();
            wire.insert(STRUCT_TAG.to_string(), Value::String(type_name.clone()));
            wire.insert("fields".to_string(), Value::Object(fields));
            Value::Object(wire)
        }
    }
}

/// Encode a call frame body.
pub fn encode_call(seq: u64, method: &str, args: &[CallArgument]) -> Result<Vec<u8>, RpcError> {
    let args: Vec<Value> = args.iter().map(encode_argument).collect();
    let frame = json!({
        "seq": seq,
        "method": method,
        "args": args,
    });
    Ok(serde_json::to_vec(&frame)?)
}

/// Decode a reply frame body into the call result or the remote failure.
pub fn decode_reply(expected_seq: u64, data: &[u8]) -> Result<Value, RpcError> {
    let mut reply: Map<String, Value> = serde_json::from_slice(data)?;

    match reply.get("seq").and_then(Value::as_u64) {
        Some(seq) if seq == expected_seq => {}
        Some(seq) => {
            return Err(RpcError::Codec(format!(
                "sequence mismatch: expected {}, got {}",
                expected_seq, seq
            )))
        }
        None => return Err(RpcError::Codec("missing sequence number".to_string())),
    }

    if let Some(exception) = reply.remove("exception") {
        let mut exception = match exception {
            Value::Object(map) => map,
            _ => return Err(RpcError::Codec("exception must be an object".to_string())),
        };
        let exception_type = exception
            .remove("type")
            .and_then(|t| t.as_str().map(str::to_string))
            .unwrap_or_else(|| "Exception".to_string());
        let attrs = match exception.remove("attrs") {
            Some(Value::Object(attrs)) => attrs,
            Some(_) => return Err(RpcError::Codec("exception attrs must be an object".to_string())),
            None => Map::new(),
        };
        return Err(RpcError::Remote { exception_type, attrs });
    }

    if let Some(error) = reply.remove("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RpcError::Application(message));
    }

    reply
        .remove("result")
        .ok_or_else(|| RpcError::Codec("reply carries neither result nor error".to_string()))
}

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, data: &[u8]) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge(data.len()));
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, RpcError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(RpcError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}
