//! Decode + normalize tests
//!
//! Generates WAV files in several layouts and checks that every supported
//! layout arrives as equal-length canonical left/right arrays with the
//! expected sample values.

mod helpers;

use helpers::*;
use pcmix::audio::normalizer::normalize;
use pcmix::audio::SimpleDecoder;
use pcmix::{Error, Source};
use std::path::Path;

fn load(path: &Path) -> pcmix::Result<pcmix::CanonicalPcm> {
    Source::from(path).load(Path::new("."))
}

fn assert_canonical_shape(pcm: &pcmix::CanonicalPcm) {
    assert_eq!(pcm.left().len(), pcm.right().len());
    assert_eq!(pcm.left().len() % 2, 0);
}

fn assert_frames_near(actual: u64, expected: u64) {
    let tolerance = expected / 100 + 16;
    assert!(
        actual + tolerance >= expected && actual <= expected + tolerance,
        "expected ~{} frames, got {}",
        expected,
        actual
    );
}

#[test]
fn test_16_bit_stereo_canonical_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    generate_wav(&path, int_spec(44100, 2, 16), &[1000, -1000, 2000, -2000, 3000, -3000]).unwrap();

    let pcm = load(&path).unwrap();
    assert_canonical_shape(&pcm);
    assert_eq!(pcm_frames(&pcm), vec![(1000, -1000), (2000, -2000), (3000, -3000)]);
}

#[test]
fn test_16_bit_mono_duplicated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mono.wav");
    generate_constant_wav(&path, int_spec(44100, 1, 16), -1234, 100).unwrap();

    let pcm = load(&path).unwrap();
    assert!(pcm.is_shared_mono());
    assert_eq!(pcm.frames(), 100);
    assert!(pcm_frames(&pcm).iter().all(|&f| f == (-1234, -1234)));
}

#[test]
fn test_8_bit_stereo_upconversion_extremes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eight.wav");
    generate_wav(&path, int_spec(44100, 2, 8), &[-128, 127, 0, 64]).unwrap();

    let pcm = load(&path).unwrap();
    assert_canonical_shape(&pcm);
    // 64/127 * 32767 = 16512.50
    assert_eq!(pcm_frames(&pcm), vec![(-32767, 32767), (0, 16513)]);
}

#[test]
fn test_8_bit_mono_low_rate_resampled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eight_mono.wav");
    generate_constant_wav(&path, int_spec(11025, 1, 8), 0, 2205).unwrap();

    let pcm = load(&path).unwrap();
    assert_canonical_shape(&pcm);
    assert!(pcm.is_shared_mono());
    assert_frames_near(pcm.frames(), 8820);
    assert!(pcm_frames(&pcm).iter().all(|&f| f == (0, 0)));
}

#[test]
fn test_16_bit_stereo_resampled_from_48k() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sine48.wav");
    generate_sine_wav(&path, 48000, 2, 500, 440.0, 0.5).unwrap();

    let pcm = load(&path).unwrap();
    assert_canonical_shape(&pcm);
    assert!(!pcm.is_shared_mono());
    assert_frames_near(pcm.frames(), 22050);
}

#[test]
fn test_16_bit_mono_resampled_from_22k() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sine22.wav");
    generate_sine_wav(&path, 22050, 1, 1000, 220.0, 0.5).unwrap();

    let pcm = load(&path).unwrap();
    assert_canonical_shape(&pcm);
    assert!(pcm.is_shared_mono());
    assert_frames_near(pcm.frames(), 44100);
}

#[test]
fn test_24_bit_converted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deep.wav");
    generate_wav(&path, int_spec(44100, 2, 24), &[0x40_0000, -0x40_0000]).unwrap();

    let pcm = load(&path).unwrap();
    assert_eq!(pcm_frames(&pcm), vec![(16384, -16384)]);
}

#[test]
fn test_reader_source() {
    let bytes = wav_bytes(int_spec(44100, 2, 16), &[5, 6, 7, 8]);
    let pcm = Source::reader(std::io::Cursor::new(bytes))
        .load(Path::new("."))
        .unwrap();
    assert_eq!(pcm_frames(&pcm), vec![(5, 6), (7, 8)]);
}

#[test]
fn test_named_resource_under_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("clips")).unwrap();
    generate_constant_wav(dir.path().join("clips/click.wav"), int_spec(44100, 2, 16), 9, 3).unwrap();

    let pcm = Source::name("/clips/click.wav").load(dir.path()).unwrap();
    assert_eq!(pcm.frames(), 3);
}

#[test]
fn test_file_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("url.wav");
    generate_constant_wav(&path, int_spec(44100, 1, 16), 3, 4).unwrap();

    let url = format!("file://{}", path.display());
    let pcm = Source::url(url).load(Path::new(".")).unwrap();
    assert_eq!(pcm.frames(), 4);
}

#[test]
fn test_percent_encoded_file_url() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("my music")).unwrap();
    let path = dir.path().join("my music").join("a.wav");
    generate_constant_wav(&path, int_spec(44100, 2, 16), 11, 5).unwrap();

    let url = format!("file://{}", path.display()).replace(' ', "%20");
    let pcm = Source::url(url).load(Path::new(".")).unwrap();
    assert_eq!(pcm_frames(&pcm), vec![(11, 11); 5]);
}

#[test]
fn test_three_channels_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("three.wav");
    generate_constant_wav(&path, int_spec(44100, 3, 16), 1, 10).unwrap();

    let result = load(&path);
    assert!(matches!(result, Err(Error::UnsupportedFormat(_))), "got {:?}", result);
}

#[test]
fn test_decoder_reports_native_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("native.wav");
    generate_constant_wav(&path, int_spec(32000, 1, 8), 10, 32).unwrap();

    let stream = SimpleDecoder::decode_file(&path).unwrap();
    let format = stream.format();
    assert_eq!(format.sample_rate, 32000);
    assert_eq!(format.bits_per_sample, 8);
    assert_eq!(format.channels, 1);

    let pcm = normalize(stream).unwrap();
    assert_frames_near(pcm.frames(), 44);
}
