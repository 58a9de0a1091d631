mod common;

use quietstretch::{process_outcome, Calibration, Preset, StreamProcessor, VocoderConfig};

use common::*;

#[test]
fn test_output_length_across_factors() {
    let frame = 512;
    let hop = 128;
    let calibration = 4;
    for frames in [5usize, 6, 13, 40] {
        let input = mix(
            &gen_sine(330.0, 44100, frame + (frames - 1) * hop, |_| 0.3),
            &gen_noise(frames as u32, frame + (frames - 1) * hop, 0.01),
        );
        for stretch in [0.1, 0.25, 0.5, 0.8, 1.0, 1.1, 1.5, 2.0, 3.3, 4.0] {
            let outcome = process_outcome(&input, &small_config(stretch, calibration)).unwrap();
            let streamed = frames - calibration;
            assert_eq!(
                outcome.output.len(),
                expected_len(streamed, stretch, frame, hop),
                "frames {} stretch {}",
                frames,
                stretch
            );
            assert_eq!(
                outcome.accumulator.num_frames(),
                ((streamed as f64 * stretch).round() as usize).max(1)
            );
        }
    }
}

#[test]
fn test_trailing_partial_frame_is_dropped() {
    let config = small_config(1.0, 0);
    let full = gen_sine(500.0, 44100, 512 + 10 * 128, |_| 0.5);
    let mut padded = full.clone();
    padded.extend(gen_sine(500.0, 44100, 127, |_| 0.5));
    let a = process_outcome(&full, &config).unwrap();
    let b = process_outcome(&padded, &config).unwrap();
    assert_eq!(a.output.len(), b.output.len());
}

#[test]
fn test_single_streamed_frame_compressed() {
    // One frame past calibration, compressed: still one output frame.
    let input = gen_noise(3, 512 + 2 * 128, 0.2);
    let outcome = process_outcome(&input, &small_config(0.2, 2)).unwrap();
    assert_eq!(outcome.accumulator.num_frames(), 1);
    assert_eq!(outcome.output.len(), 512);
}

#[test]
fn test_duration_calibration_resolves_frames() {
    let config = VocoderConfig::new(1.0)
        .unwrap()
        .with_preset(Preset::Speech)
        .with_sample_rate(16000)
        .with_calibration(Calibration::Duration(0.25));
    let processor = StreamProcessor::new(&config).unwrap();
    // 4000 samples: (4000 - 1024) / 256 = 11.6 -> 12, plus one.
    assert_eq!(processor.params().calibration_frames, 13);
    assert_eq!(processor.latency_samples(), 1024 + 13 * 256);
    assert!((processor.latency_secs() - (1024.0 + 13.0 * 256.0) / 16000.0).abs() < 1e-9);
}

#[test]
fn test_stretch_scales_duration() {
    let sr = 44100;
    let input = gen_sine(440.0, sr, sr as usize, |_| 0.5);
    let config = VocoderConfig::new(2.0)
        .unwrap()
        .with_calibration(Calibration::Frames(0));
    let output = quietstretch::process(&input, &config).unwrap();
    let ratio = output.len() as f64 / input.len() as f64;
    assert!((ratio - 2.0).abs() < 0.05, "ratio {}", ratio);
}
