//! Sample payload codec.
//!
//! The native bridge only carries primitives and strings, so PCM crosses it
//! as base64 text over little-endian `f32` bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use suna_core::{BridgeError, BridgeResult, BYTES_PER_SAMPLE};

/// Encode mono PCM as base64.
pub fn encode_pcm(pcm: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(pcm.len() * BYTES_PER_SAMPLE);
    for sample in pcm {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Decode a payload produced by [`encode_pcm`].
///
/// Fails with [`BridgeError::Decode`] on invalid base64 or when the byte
/// count is not a whole number of samples.
pub fn decode_pcm(payload: &str) -> BridgeResult<Vec<f32>> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| BridgeError::Decode(format!("invalid base64 payload: {e}")))?;
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(BridgeError::Decode(format!(
            "payload of {} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encoding() {
        // 1.0f32 is 0x3F800000, little-endian 00 00 80 3F.
        assert_eq!(encode_pcm(&[1.0]), "AACAPw==");
        assert_eq!(decode_pcm("AACAPw==").unwrap(), vec![1.0]);
    }

    #[test]
    fn test_round_trip_preserves_bits() {
        let pcm = [0.0, -0.0, 0.25, -1.5, f32::MIN_POSITIVE, f32::MAX];
        let decoded = decode_pcm(&encode_pcm(&pcm)).unwrap();
        for (a, b) in pcm.iter().zip(&decoded) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(encode_pcm(&[]), "");
        assert!(decode_pcm("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_pcm("not base64!"), Err(BridgeError::Decode(_))));
        // Three bytes.
        assert!(matches!(decode_pcm("AAAA"), Err(BridgeError::Decode(_))));
    }
}
