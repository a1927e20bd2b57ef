use super::energy::EnergyProfile;

/// Onset of the first bat/ball contact candidate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpikeEvent {
    /// Index into the energy profile. Never 0, because the rise test needs
    /// a preceding frame.
    pub index: usize,
    /// Start of the spike window in seconds, rounded to centiseconds.
    pub timestamp: f64,
}

/// Index of the first frame that is both loud (`> threshold`) and a sharp
/// rise over the frame before it (`> previous * rise_ratio`).
///
/// This is a leftmost match: the earliest qualifying onset wins even when a
/// later frame is louder.
pub fn first_spike_index(values: &[f32], threshold: f32, rise_ratio: f32) -> Option<usize> {
    (1..values.len()).find(|&i| values[i] > threshold && values[i] > values[i - 1] * rise_ratio)
}

pub fn detect_spike(
    profile: &EnergyProfile,
    sample_rate: u32,
    threshold: f32,
    rise_ratio: f32,
) -> Option<SpikeEvent> {
    let index = first_spike_index(&profile.values, threshold, rise_ratio)?;
    let seconds = (index * profile.framing.hop_length) as f64 / f64::from(sample_rate);
    Some(SpikeEvent {
        index,
        timestamp: round_centis(seconds),
    })
}

/// Round to two decimals on the exact binary value of `seconds`, ties to
/// even. `0.975` is stored just below the tie and becomes `0.97`; `0.125`
/// is an exact tie and becomes `0.12`. Scaling by 100 first would round
/// both up.
pub fn round_centis(seconds: f64) -> f64 {
    if !seconds.is_finite() || seconds == 0.0 {
        return seconds;
    }
    let bits = seconds.abs().to_bits();
    let biased_exp = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exp) = if biased_exp == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exp - 1075)
    };
    if exp >= 0 {
        // Already an integer.
        return seconds;
    }

    // |seconds| * 100 == scaled / 2^shift exactly
    let scaled = u128::from(mantissa) * 100;
    let shift = (-exp) as u32;
    let centis = if shift >= 64 {
        0
    } else {
        let quotient = scaled >> shift;
        let remainder = scaled & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        if remainder > half || (remainder == half && quotient % 2 == 1) {
            quotient + 1
        } else {
            quotient
        }
    };
    (centis as f64 / 100.0).copysign(seconds)
}
