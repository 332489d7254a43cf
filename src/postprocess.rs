//! Post-processing: pitch resampling, gain and fade-out
//!
//! These run on a finished [`DecodeOutput`](crate::stream::DecodeOutput)
//! sample buffer. [`render`] chains them in the order resample, gain, fade.

use crate::config::DecoderConfig;
use crate::constants::{clamp16, DEFAULT_AMP, PITCH_FRACTION_BITS, UNITY_PITCH};

const FRACTION_MASK: u64 = (1 << PITCH_FRACTION_BITS) - 1;
const FRACTION_SCALE: f64 = (1u64 << PITCH_FRACTION_BITS) as f64;

/// Number of output frames [`resample`] produces for `input_len` frames
pub fn resampled_len(input_len: usize, pitch: u16) -> usize {
    if input_len == 0 || pitch == 0 {
        return 0;
    }
    ((input_len as u64 - 1) * UNITY_PITCH as u64 / pitch as u64 + 1) as usize
}

/// Linear-interpolation pitch shift.
///
/// The read position advances by `pitch / 0x1000` input frames per output
/// frame; each output interpolates between the two surrounding input frames
/// with a 12-bit fractional weight. Unity pitch returns the input as is.
pub fn resample(samples: &[i16], pitch: u16) -> Vec<i16> {
    if pitch == UNITY_PITCH {
        return samples.to_vec();
    }
    let out_len = resampled_len(samples.len(), pitch);
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len as u64 {
        let position = i * pitch as u64;
        let index = (position >> PITCH_FRACTION_BITS) as usize;
        let frac = (position & FRACTION_MASK) as f64 / FRACTION_SCALE;
        let a = samples[index] as f64;
        let b = samples.get(index + 1).copied().map_or(a, f64::from);
        out.push((a * (1.0 - frac) + b * frac) as i16);
    }
    out
}

/// Fade the last `fade_frames` samples linearly toward zero.
///
/// Sample `i` in the fade window is scaled by `(len - i) / fade_frames`.
/// Nothing happens when the buffer is not longer than the fade.
pub fn apply_fade(samples: &mut [i16], fade_frames: usize) {
    let len = samples.len();
    if fade_frames == 0 || len <= fade_frames {
        return;
    }
    let start = len - fade_frames;
    for (i, sample) in samples.iter_mut().enumerate().skip(start) {
        let multiplier = (len - i) as f64 / fade_frames as f64;
        *sample = (*sample as f64 * multiplier) as i16;
    }
}

/// Scale by `amp / DEFAULT_AMP`, clamping to 16 bits.
pub fn apply_gain(samples: &mut [i16], amp: u32) {
    if amp == DEFAULT_AMP {
        return;
    }
    let gain = amp as f64 / DEFAULT_AMP as f64;
    for sample in samples.iter_mut() {
        *sample = clamp16((*sample as f64 * gain) as i32);
    }
}

/// Apply the configured pitch, gain and fade to decoded samples
pub fn render(samples: &[i16], config: &DecoderConfig) -> Vec<i16> {
    let mut out = resample(samples, config.pitch);
    apply_gain(&mut out, config.amp);
    apply_fade(&mut out, config.fade_frames);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_unity_is_identity() {
        let input = vec![1, -2, 3, -4];
        assert_eq!(resample(&input, 0x1000), input);
    }

    #[test]
    fn test_resample_double_pitch_halves_length() {
        let input: Vec<i16> = (0..32).map(|i| i * 100).collect();
        let out = resample(&input, 0x2000);
        assert_eq!(out.len(), 16);
        assert_eq!(out.len(), resampled_len(32, 0x2000));
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 200);
        assert_eq!(out[15], 3000);
    }

    #[test]
    fn test_resample_half_pitch_interpolates() {
        let input = vec![0, 100, -100];
        let out = resample(&input, 0x800);
        assert_eq!(out, vec![0, 50, 100, 0, -100]);
    }

    #[test]
    fn test_resampled_len_formula() {
        assert_eq!(resampled_len(0, 0x1000), 0);
        assert_eq!(resampled_len(1, 0x3000), 1);
        assert_eq!(resampled_len(10, 0x3000), 4);
        assert_eq!(resampled_len(100, 0x1800), 67);
    }

    #[test]
    fn test_resample_fractional_truncates() {
        // pitch 0x1800 = 1.5 frames per output
        let input = vec![0, 3, 6, 9];
        let out = resample(&input, 0x1800);
        assert_eq!(out, vec![0, 4, 9]);
    }

    #[test]
    fn test_fade_ramp() {
        let mut samples = vec![1000i16; 10];
        apply_fade(&mut samples, 4);
        assert_eq!(&samples[..6], &[1000; 6]);
        assert_eq!(&samples[6..], &[1000, 750, 500, 250]);
    }

    #[test]
    fn test_fade_skipped_when_too_short() {
        let mut samples = vec![1000i16; 4];
        apply_fade(&mut samples, 4);
        assert_eq!(samples, vec![1000; 4]);
        apply_fade(&mut samples, 0);
        assert_eq!(samples, vec![1000; 4]);
    }

    #[test]
    fn test_gain_scales_and_clamps() {
        let mut samples = vec![100, -100, 30_000];
        apply_gain(&mut samples, DEFAULT_AMP * 2);
        assert_eq!(samples, vec![200, -200, i16::MAX]);

        let mut samples = vec![101, -101];
        apply_gain(&mut samples, DEFAULT_AMP / 2);
        assert_eq!(samples, vec![50, -50]);

        let mut samples = vec![7];
        apply_gain(&mut samples, DEFAULT_AMP);
        assert_eq!(samples, vec![7]);
    }

    #[test]
    fn test_render_chain() {
        let input: Vec<i16> = vec![1000; 40];
        let config = DecoderConfig::raw().pitch(0x2000).amp(DEFAULT_AMP * 2).fade(10);
        let out = render(&input, &config);
        assert_eq!(out.len(), 20);
        assert_eq!(out[0], 2000);
        assert_eq!(out[19], 200);
    }
}
