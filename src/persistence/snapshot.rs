//! Binary snapshot envelope
//!
//! Layout (little-endian, fixed-width integers):
//!
//! | field       | encoding                    |
//! |-------------|-----------------------------|
//! | version     | `u32`                       |
//! | environment | `u64` length + UTF-8 bytes  |
//! | body        | bincode/serde of the caller's state |
//!
//! The version is checked before the environment name, and the name before
//! any of the body is decoded. Decoding never touches live state: callers
//! get an owned value and decide what to install.

use bincode::config::{Configuration, Fixint, LittleEndian};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SnapshotError;

/// Bump whenever the body layout of any environment changes.
pub const SNAPSHOT_VERSION: u32 = 1;

fn config() -> Configuration<LittleEndian, Fixint> {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Serialize `body` behind the version and environment header.
pub fn encode<T: Serialize>(env: &str, body: &T) -> Result<Vec<u8>, SnapshotError> {
    Ok(bincode::serde::encode_to_vec(
        (SNAPSHOT_VERSION, env, body),
        config(),
    )?)
}

/// Check the header and decode the body. Trailing bytes are an error.
pub fn decode<T: DeserializeOwned>(env: &str, bytes: &[u8]) -> Result<T, SnapshotError> {
    let (version, mut offset): (u32, usize) = bincode::serde::decode_from_slice(bytes, config())?;
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: version,
        });
    }

    let (name, read): (String, usize) =
        bincode::serde::decode_from_slice(&bytes[offset..], config())?;
    offset += read;
    if name != env {
        return Err(SnapshotError::EnvMismatch {
            expected: env.to_string(),
            found: name,
        });
    }

    let (body, read): (T, usize) = bincode::serde::decode_from_slice(&bytes[offset..], config())?;
    offset += read;
    if offset != bytes.len() {
        return Err(SnapshotError::TrailingBytes(bytes.len() - offset));
    }

    Ok(body)
}
