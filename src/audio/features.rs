use rustfft::{num_complex::Complex, FftPlanner};

use super::energy::Framing;

const ZERO_THRESHOLD: f32 = 1e-10;
const N_MELS: usize = 128;
const N_MFCC: usize = 13;
const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

/// Acoustic descriptors of the window around a detected spike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactFeatures {
    /// Mean zero-crossing rate (crossings per sample)
    pub zcr: f32,
    /// Mean spectral centroid (Hz)
    pub spectral_centroid: f32,
    /// Mean over 13 MFCCs and all frames. Not used by the contact rule.
    pub mfcc_mean: f32,
}

pub fn extract(segment: &[f32], sample_rate: u32) -> ContactFeatures {
    let framing = Framing::LIBROSA_DEFAULT;
    let zcr = zero_crossing_rate(segment, framing);
    let spectrogram = stft_magnitudes(segment, framing);
    let spectral_centroid = spectral_centroid(&spectrogram, sample_rate, framing.frame_length);
    let mfcc_mean = mfcc_mean(&spectrogram, sample_rate, framing.frame_length);

    let features = ContactFeatures {
        zcr,
        spectral_centroid,
        mfcc_mean,
    };
    log::debug!(
        "Contact features: zcr={:.4}, centroid={:.1}Hz, mfcc_mean={:.3}",
        features.zcr,
        features.spectral_centroid,
        features.mfcc_mean
    );
    features
}

/// Mean fraction of sign changes per frame. Near-zero samples count as zero
/// and zero counts as positive; centred frames are padded with the edge
/// values so the padding adds no crossings.
pub fn zero_crossing_rate(segment: &[f32], framing: Framing) -> f32 {
    if segment.is_empty() {
        return 0.0;
    }

    let pad = if framing.centered { framing.frame_length / 2 } else { 0 };
    let first = segment[0];
    let last = segment[segment.len() - 1];
    let padded: Vec<f32> = std::iter::repeat(first)
        .take(pad)
        .chain(segment.iter().copied())
        .chain(std::iter::repeat(last).take(pad))
        .map(|s| if s.abs() <= ZERO_THRESHOLD { 0.0 } else { s })
        .collect();

    let n = framing.frame_count(segment.len());
    if n == 0 {
        return 0.0;
    }

    let total: f32 = (0..n)
        .map(|i| {
            let start = i * framing.hop_length;
            let frame = &padded[start..start + framing.frame_length];
            let crossings = frame
                .windows(2)
                .filter(|w| w[0].is_sign_negative() != w[1].is_sign_negative())
                .count();
            crossings as f32 / framing.frame_length as f32
        })
        .sum();

    total / n as f32
}

/// Magnitude spectra (`n_fft / 2 + 1` bins) of Hann-windowed frames.
/// Centred framing zero-pads the segment.
pub fn stft_magnitudes(segment: &[f32], framing: Framing) -> Vec<Vec<f32>> {
    let n_fft = framing.frame_length;
    let pad = if framing.centered { n_fft / 2 } else { 0 };
    let mut padded = vec![0.0f32; segment.len() + 2 * pad];
    padded[pad..pad + segment.len()].copy_from_slice(segment);

    let n = framing.frame_count(segment.len());
    let window = hann_window(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let bins = n_fft / 2 + 1;

    (0..n)
        .map(|i| {
            let start = i * framing.hop_length;
            let mut buffer: Vec<Complex<f32>> = padded[start..start + n_fft]
                .iter()
                .zip(window.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            fft.process(&mut buffer);
            buffer[..bins].iter().map(|c| c.norm()).collect()
        })
        .collect()
}

/// Mean over frames of the magnitude-weighted mean frequency. Silent frames
/// contribute a centroid of 0.
pub fn spectral_centroid(spectrogram: &[Vec<f32>], sample_rate: u32, n_fft: usize) -> f32 {
    if spectrogram.is_empty() {
        return 0.0;
    }
    let freq_resolution = f64::from(sample_rate) / n_fft as f64;

    let total: f64 = spectrogram
        .iter()
        .map(|frame| {
            let energy: f64 = frame.iter().map(|&m| f64::from(m)).sum();
            if energy <= 1e-10 {
                return 0.0;
            }
            frame
                .iter()
                .enumerate()
                .map(|(k, &m)| k as f64 * freq_resolution * f64::from(m))
                .sum::<f64>()
                / energy
        })
        .sum();

    (total / spectrogram.len() as f64) as f32
}

/// Mean of the first 13 mel-frequency cepstral coefficients over all frames.
pub fn mfcc_mean(spectrogram: &[Vec<f32>], sample_rate: u32, n_fft: usize) -> f32 {
    if spectrogram.is_empty() {
        return 0.0;
    }
    let basis = mel_filterbank(sample_rate, n_fft, N_MELS);

    let mut mel_db: Vec<Vec<f64>> = spectrogram
        .iter()
        .map(|frame| {
            basis
                .iter()
                .map(|filter| {
                    let power: f64 = filter
                        .iter()
                        .zip(frame.iter())
                        .map(|(&w, &m)| w * f64::from(m) * f64::from(m))
                        .sum();
                    10.0 * power.max(AMIN).log10()
                })
                .collect()
        })
        .collect();

    // Clamp the dynamic range relative to the loudest cell
    let peak_db = mel_db
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    for v in mel_db.iter_mut().flatten() {
        *v = v.max(peak_db - TOP_DB);
    }

    let mut sum = 0.0f64;
    for frame in &mel_db {
        sum += dct_ortho(frame, N_MFCC).iter().sum::<f64>();
    }
    (sum / (N_MFCC * mel_db.len()) as f64) as f32
}

/// Slaney-style mel filterbank with area normalization, `n_mels` rows of
/// `n_fft / 2 + 1` weights spanning 0 Hz to Nyquist.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let bins = n_fft / 2 + 1;
    let nyquist = f64::from(sample_rate) / 2.0;
    let fft_freqs: Vec<f64> = (0..bins)
        .map(|k| k as f64 * f64::from(sample_rate) / n_fft as f64)
        .collect();

    let mel_max = hz_to_mel(nyquist);
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|i| {
            let lower_width = mel_f[i + 1] - mel_f[i];
            let upper_width = mel_f[i + 2] - mel_f[i + 1];
            let enorm = 2.0 / (mel_f[i + 2] - mel_f[i]);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - mel_f[i]) / lower_width;
                    let upper = (mel_f[i + 2] - f) / upper_width;
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// First `n_out` coefficients of the orthonormal DCT-II.
fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
                })
                .sum();
            scale * sum
        })
        .collect()
}

/// Periodic Hann window, as used for spectral analysis.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
        .collect()
}
