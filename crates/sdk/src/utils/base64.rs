use base64::engine::{general_purpose, Engine};

use crate::error::DecodeError;

/// Encode base64
pub fn encode_base64(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Decode base64
pub fn decode_base64(data: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(general_purpose::STANDARD.decode(data)?)
}
