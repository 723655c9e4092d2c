// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing for daemon IPC: a 4-byte big-endian length prefix followed by
//! a JSON payload. `encode`/`decode` handle the JSON layer; `write_message`/
//! `read_message` handle framing over an async stream.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("message exceeds maximum frame size ({0} bytes)")]
    FrameTooLarge(usize),
}

/// Largest single frame the protocol accepts, guarding against a corrupt or
/// malicious length prefix causing an unbounded allocation.
pub const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

/// Serializes `value` to raw JSON bytes. No length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserializes raw JSON bytes produced by [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Writes `payload` prefixed with its length as 4 big-endian bytes.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    if payload.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a 4-byte big-endian length prefix followed by that many bytes.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

pub async fn write_request<W: AsyncWrite + Unpin>(writer: &mut W, request: &Request) -> Result<(), ProtocolError> {
    write_message(writer, &encode(request)?).await
}

pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Request, ProtocolError> {
    decode(&read_message(reader).await?)
}

pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response) -> Result<(), ProtocolError> {
    write_message(writer, &encode(response)?).await
}

pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Response, ProtocolError> {
    decode(&read_message(reader).await?)
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
