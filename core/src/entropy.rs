//! entropy.rs
//! Shannon entropy over the byte-value distribution.
//!
//! Used as the compressibility signal fed to the codec predictor:
//! ~0 bits/byte for constant data, ~8 bits/byte for random or
//! already-compressed data.

/// Shannon entropy of `data` in bits per byte, in `[0.0, 8.0]`.
/// Empty input has entropy `0.0`.
pub fn entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let len = data.len() as f64;
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum();

    // Guard against -0.0 and float drift past the alphabet bound.
    h.clamp(0.0, 8.0)
}
