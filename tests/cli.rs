use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn snicko(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_snicko"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run snicko")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// 16-bit mono WAV: `lead` seconds of silence, then a 50ms full-scale burst.
fn write_burst_wav(path: &Path, sample_rate: u32, lead: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..(lead * sample_rate as f32) as usize {
        writer.write_sample(0i16).unwrap();
    }
    for i in 0..(sample_rate / 20) {
        writer.write_sample(if i % 2 == 0 { i16::MAX } else { -i16::MAX }).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn audio_without_path_exits_nonzero() {
    let output = snicko(&["audio"]);
    assert!(!output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"error":"Missing audio file path"}"#
    );
}

#[test]
fn video_without_path_exits_nonzero() {
    let output = snicko(&["video"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["error"], "Missing video file path");
}

#[test]
fn audio_burst_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("delivery.wav");
    write_burst_wav(&wav, 16000, 1.0);

    let output = snicko(&["audio", wav.to_str().unwrap()]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["spikeDetected"], true);
    let timestamp = json["timestamp"].as_f64().unwrap();
    assert!((timestamp - 1.0).abs() < 0.05, "timestamp = {}", timestamp);
    assert_ne!(json["hitStatus"], "no_contact");
    assert!(json["musicDetected"].is_boolean());
}

#[test]
fn silent_audio_has_no_contact() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("silence.wav");
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
    for _ in 0..22050 * 2 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let output = snicko(&["audio", wav.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        serde_json::json!({
            "spikeDetected": false,
            "timestamp": null,
            "hitStatus": "no_contact",
            "musicDetected": false
        })
    );
}

#[test]
fn unreadable_audio_is_an_error_payload() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("not_audio.wav");
    std::fs::write(&bogus, b"definitely not a wav file").unwrap();

    let output = snicko(&["audio", bogus.to_str().unwrap()]);
    assert!(output.status.success());
    let error = stdout_json(&output)["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Audio processing failed: "), "{}", error);
}

#[test]
fn missing_audio_file_is_an_error_payload() {
    let output = snicko(&["audio", "/nonexistent/delivery.wav"]);
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["error"].as_str().unwrap().starts_with("Audio processing failed: "));
}

#[test]
fn video_without_pose_source_is_an_error_payload() {
    let output = snicko(&["video", "/nonexistent/delivery.mp4"]);
    assert!(output.status.success());
    let error = stdout_json(&output)["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Video processing failed: "), "{}", error);
    assert!(error.contains("pose"), "{}", error);
}

#[test]
fn missing_video_file_is_an_error_payload() {
    let dir = tempfile::tempdir().unwrap();
    let landmarks = dir.path().join("poses.json");
    std::fs::write(&landmarks, "[]").unwrap();

    let output = snicko(&[
        "video",
        "/nonexistent/delivery.mp4",
        "--landmarks",
        landmarks.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let error = stdout_json(&output)["error"].as_str().unwrap().to_string();
    assert_eq!(
        error,
        "Video processing failed: Input file not found: /nonexistent/delivery.mp4"
    );
}

#[test]
fn video_output_is_pretty_printed() {
    let output = snicko(&["video", "/nonexistent/delivery.mp4"]);
    assert!(String::from_utf8_lossy(&output.stdout).trim().contains('\n'));
}
