mod common;

use quietstretch::io::{read_wav_file, write_wav_file, WavFormat};
use quietstretch::{process_buffer, AudioBuffer, Calibration, Preset, StretchError, VocoderConfig};

use common::*;

#[test]
fn test_file_to_file_stretch() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.wav");
    let output_path = dir.path().join("output.wav");

    let sr = 22050;
    let n = sr as usize;
    let samples = mix(
        &gen_sine(440.0, sr, n, |i| if i > sr as usize / 4 { 0.5 } else { 0.0 }),
        &gen_noise(3, n, 0.02),
    );
    let input = AudioBuffer::mono(samples, sr).unwrap();
    write_wav_file(&input_path, &input, WavFormat::Pcm16).unwrap();

    let loaded = read_wav_file(&input_path).unwrap();
    assert_eq!(loaded.sample_rate, sr);
    assert_eq!(loaded.num_frames(), n);

    let config = VocoderConfig::new(1.5)
        .unwrap()
        .with_preset(Preset::Speech)
        .with_calibration(Calibration::Duration(0.2));
    let stretched = process_buffer(&loaded, &config).unwrap();
    assert_eq!(stretched.sample_rate, sr);
    write_wav_file(&output_path, &stretched, WavFormat::Float32).unwrap();

    let reread = read_wav_file(&output_path).unwrap();
    assert_eq!(reread, stretched);
    let ratio = reread.duration_secs() / (loaded.duration_secs() - 0.2);
    assert!((ratio - 1.5).abs() < 0.1, "duration ratio {}", ratio);
}

#[test]
fn test_stereo_file_needs_channel_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    let interleaved: Vec<f32> = gen_sine(300.0, 44100, 8192, |_| 0.5)
        .into_iter()
        .flat_map(|s| [s, -s])
        .collect();
    let stereo = AudioBuffer::new(interleaved, 2, 44100).unwrap();
    write_wav_file(&path, &stereo, WavFormat::Float32).unwrap();

    let loaded = read_wav_file(&path).unwrap();
    assert_eq!(loaded.channels, 2);
    let config = VocoderConfig::new(1.0)
        .unwrap()
        .with_frame_size(512)
        .with_calibration(Calibration::Frames(0));
    assert_eq!(
        process_buffer(&loaded, &config).err(),
        Some(StretchError::InvalidChannels(2))
    );

    let left = AudioBuffer::mono(loaded.channel_data(0), loaded.sample_rate).unwrap();
    assert!(process_buffer(&left, &config).is_ok());
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let config = VocoderConfig::new(0.8)
        .unwrap()
        .with_preset(Preset::LowLatency)
        .with_normalization_target(0.9);
    config.write_json_file(&path).unwrap();
    let loaded = VocoderConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.effective_hop_size(), 128);
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "stretch_factor": 2.0, "calibration": { "frames": 3 } }"#).unwrap();
    let loaded = VocoderConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded.stretch_factor, 2.0);
    assert_eq!(loaded.calibration, Calibration::Frames(3));
    assert_eq!(loaded.frame_size, 2048);
    assert_eq!(loaded.effective_hop_size(), 512);
}

#[test]
fn test_bad_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "stretch_factor": -3.0 }"#).unwrap();
    assert!(VocoderConfig::from_json_file(&path).is_err());
    assert!(matches!(
        VocoderConfig::from_json_file(&dir.path().join("missing.json")),
        Err(StretchError::Io(_))
    ));
}

#[test]
fn test_preset_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speech.json");
    std::fs::write(&path, r#"{ "preset": "speech", "stretch_factor": 1.2 }"#).unwrap();
    let loaded = VocoderConfig::from_json_file(&path).unwrap();
    assert_eq!(
        loaded,
        VocoderConfig::new(1.2).unwrap().with_preset(Preset::Speech)
    );
}
