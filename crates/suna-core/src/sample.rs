//! Decoded sample payloads.
//!
//! File decoding happens outside the bridge. What arrives here is already
//! PCM: one or more channels of `f32` at a known rate. The bridge only ever
//! stores mono, so multi-channel input is averaged down first.

use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};

/// Mono PCM ready to be loaded into a slot.
///
/// The samples live behind an `Arc` so the same buffer can be recorded in a
/// [`SlotTable`](crate::SlotTable) and handed to the render side without a
/// second copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pcm: Arc<[f32]>,
    sample_rate: f32,
    name: String,
}

impl SampleBuffer {
    /// Wrap mono PCM. Fails for a non-positive or non-finite sample rate.
    pub fn new(name: impl Into<String>, pcm: Vec<f32>, sample_rate: f32) -> BridgeResult<Self> {
        Self::from_shared(name, pcm.into(), sample_rate)
    }

    /// Wrap samples that are already shared.
    pub fn from_shared(
        name: impl Into<String>,
        pcm: Arc<[f32]>,
        sample_rate: f32,
    ) -> BridgeResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BridgeError::Decode(format!("invalid sample rate {sample_rate}")));
        }
        Ok(Self {
            pcm,
            sample_rate,
            name: name.into(),
        })
    }

    /// Average `channels` into mono and wrap the result.
    pub fn from_channels(
        name: impl Into<String>,
        channels: &[&[f32]],
        sample_rate: f32,
    ) -> BridgeResult<Self> {
        let mono = downmix_to_mono(channels)?;
        Self::new(name, mono, sample_rate)
    }

    /// Keep at most `max_samples` samples. Longer input is clamped, not rejected.
    pub fn truncated(self, max_samples: usize) -> Self {
        if self.pcm.len() <= max_samples {
            return self;
        }
        log::debug!(
            "truncating '{}' from {} to {} samples",
            self.name,
            self.pcm.len(),
            max_samples
        );
        Self {
            pcm: Arc::from(&self.pcm[..max_samples]),
            sample_rate: self.sample_rate,
            name: self.name,
        }
    }

    pub fn pcm(&self) -> &[f32] {
        &self.pcm
    }

    /// Shared handle to the samples.
    pub fn shared_pcm(&self) -> Arc<[f32]> {
        Arc::clone(&self.pcm)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.pcm.len() as f64 / self.sample_rate as f64
    }
}

/// Average all channels sample-by-sample. A single channel is copied as-is.
pub fn downmix_to_mono(channels: &[&[f32]]) -> BridgeResult<Vec<f32>> {
    let Some(first) = channels.first() else {
        return Err(BridgeError::Decode("no channels".into()));
    };
    if channels.iter().any(|c| c.len() != first.len()) {
        return Err(BridgeError::Decode("channel lengths differ".into()));
    }
    if channels.len() == 1 {
        return Ok(first.to_vec());
    }

    let scale = 1.0 / channels.len() as f32;
    let mut mono = vec![0.0f32; first.len()];
    for channel in channels {
        for (out, s) in mono.iter_mut().zip(channel.iter()) {
            *out += *s;
        }
    }
    for s in &mut mono {
        *s *= scale;
    }
    Ok(mono)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_downmix_stereo_average() {
        let left = [1.0, 0.5, -1.0];
        let right = [0.0, 0.5, 1.0];
        let mono = downmix_to_mono(&[&left, &right]).unwrap();
        assert_relative_eq!(mono[0], 0.5);
        assert_relative_eq!(mono[1], 0.5);
        assert_relative_eq!(mono[2], 0.0);
    }

    #[test]
    fn test_downmix_errors() {
        assert!(matches!(downmix_to_mono(&[]), Err(BridgeError::Decode(_))));
        let a = [0.0; 4];
        let b = [0.0; 3];
        assert!(matches!(downmix_to_mono(&[&a, &b]), Err(BridgeError::Decode(_))));
    }

    #[test]
    fn test_invalid_rate() {
        assert!(SampleBuffer::new("x", vec![0.0], 0.0).is_err());
        assert!(SampleBuffer::new("x", vec![0.0], f32::NAN).is_err());
    }

    #[test]
    fn test_truncated_keeps_prefix() {
        let pcm: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let sample = SampleBuffer::new("ramp", pcm, 44_100.0).unwrap().truncated(4);
        assert_eq!(sample.pcm(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(sample.name(), "ramp");
    }

    #[test]
    fn test_duration() {
        let sample = SampleBuffer::new("one second", vec![0.0; 48_000], 48_000.0).unwrap();
        assert_relative_eq!(sample.duration(), 1.0);
    }
}
