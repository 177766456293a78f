//! Signal-level metrics computed directly on PCM data.
//!
//! [`peak_to_peak`] is the loudness proxy attached to every report. It is
//! independent of the classifier and costs a single pass over the buffer.

/// Peak-to-peak amplitude: `max(samples) - min(samples)`.
///
/// * An empty buffer yields `0.0`.
/// * A constant buffer yields exactly `0.0`.
/// * `NaN` samples are ignored.
///
/// ```rust
/// use urban_sounds::audio::peak_to_peak;
///
/// assert_eq!(peak_to_peak(&[0.25; 64]), 0.0);
/// assert!((peak_to_peak(&[-1.0, 0.3, 0.9]) - 1.9).abs() < 1e-6);
/// ```
pub fn peak_to_peak(samples: &[f32]) -> f32 {
    let mut iter = samples.iter().copied().filter(|s| !s.is_nan());
    let Some(first) = iter.next() else {
        return 0.0;
    };

    let (min, max) = iter.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
    max - min
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
