//! Engine integration tests
//!
//! Runs a real engine (playback thread, mixer, references) against the
//! capture device. The device only accepts audio the test grants, so each
//! assertion sees an exact span of the mixed output.

mod helpers;

use helpers::*;
use pcmix::{
    Engine, EngineConfig, Error, EventListener, Music, MusicAction, MusicEvent, SoundAction,
    SoundEvent,
};
use serial_test::serial;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Recorder {
    music: Mutex<Vec<MusicAction>>,
    sound: Mutex<Vec<(u64, SoundAction)>>,
}

impl EventListener for Recorder {
    fn on_music_event(&self, event: &MusicEvent) {
        self.music.lock().unwrap().push(event.action);
    }

    fn on_sound_event(&self, event: &SoundEvent) {
        self.sound.lock().unwrap().push((event.voice, event.action));
    }
}

impl Recorder {
    fn music(&self) -> Vec<MusicAction> {
        self.music.lock().unwrap().clone()
    }

    fn sound(&self) -> Vec<(u64, SoundAction)> {
        self.sound.lock().unwrap().clone()
    }
}

fn ramp(frames: i16) -> Vec<(i16, i16)> {
    (1..=frames).map(|v| (v * 10, -v * 10)).collect()
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
#[serial]
fn test_uninitialized_engine() {
    let engine = Engine::new(EngineConfig::default());

    assert!(!engine.is_initialized());
    assert_eq!(engine.global_volume(), -1.0);
    assert!(matches!(engine.set_global_volume(0.5), Err(Error::InvalidState(_))));
    assert!(matches!(
        engine.load_music(constant_source(1, 4), false),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        engine.load_sound(constant_source(1, 4), false),
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(engine.shutdown(), Err(Error::InvalidState(_))));
}

#[test]
#[serial]
fn test_double_init_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, _handle) = capture_engine(scratch.path());

    let (second, _) = CaptureDevice::new();
    assert!(matches!(engine.init_with_device(second), Err(Error::InvalidState(_))));
    assert!(engine.is_initialized());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_shutdown_stops_device_and_allows_reinit() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    assert!(handle.started());
    assert_eq!(engine.global_volume(), 1.0);

    engine.shutdown().unwrap();
    assert!(handle.stopped());
    assert!(handle.flushes() >= 1);
    assert!(!engine.is_initialized());
    assert_eq!(engine.global_volume(), -1.0);
    assert!(matches!(engine.shutdown(), Err(Error::InvalidState(_))));

    let (device, _) = CaptureDevice::new();
    engine.init_with_device(device).unwrap();
    assert!(engine.is_initialized());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_invalid_config_rejected_at_init() {
    let engine = Engine::new(EngineConfig {
        max_block_frames: 0,
        ..EngineConfig::default()
    });
    let (device, handle) = CaptureDevice::new();

    assert!(matches!(engine.init_with_device(device), Err(Error::Config(_))));
    assert!(!engine.is_initialized());
    assert!(!handle.started());
}

#[test]
#[serial]
fn test_device_failure_reported_at_shutdown() {
    let scratch = tempfile::tempdir().unwrap();
    let engine = Engine::new(EngineConfig {
        scratch_dir: Some(scratch.path().to_path_buf()),
        ..EngineConfig::default()
    });
    let (device, handle) = CaptureDevice::failing();
    engine.init_with_device(device).unwrap();

    handle.grant_frames(16);
    assert!(wait_until(|| handle.stopped()), "playback thread never stopped");

    let result = engine.shutdown();
    assert!(matches!(result, Err(Error::AudioOutput(_))), "got {:?}", result);
    assert_eq!(handle.captured_len(), 0);
}

#[test]
#[serial]
fn test_missing_file_not_found() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, _handle) = capture_engine(scratch.path());

    let result = engine.load_music(scratch.path().join("absent.wav"), false);
    assert!(matches!(result, Err(Error::ResourceNotFound(_))), "got {:?}", result);
    engine.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Music playback
// ---------------------------------------------------------------------------

#[test]
#[serial]
fn test_silence_until_played() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let music = engine.load_music(constant_source(500, 8), false).unwrap();

    assert_eq!(handle.capture_frames(4), vec![(0, 0); 4]);
    assert!(!music.playing());
    assert!(!music.done());
    assert_eq!(music.position_frames(), 0);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_music_plays_to_end() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    engine.register_event_listener(recorder.clone());

    let music = engine.load_music(pcm_source(&ramp(4)), false).unwrap();
    assert_eq!(music.frames(), 4);
    music.play(false);

    let captured = handle.capture_frames(6);
    assert_eq!(&captured[..4], ramp(4).as_slice());
    assert_eq!(&captured[4..], &[(0, 0), (0, 0)]);

    assert!(!music.playing());
    assert!(music.done());
    assert_eq!(recorder.music(), vec![MusicAction::Play, MusicAction::Stop]);

    // Done persists until an explicit rewind
    handle.capture_frames(2);
    assert!(music.done());
    music.rewind();
    assert!(!music.done());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_music_loop_window() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    engine.register_event_listener(recorder.clone());

    let frames = [(1, 1), (2, 2), (3, 3), (4, 4)];
    let music = engine.load_music(pcm_source(&frames), false).unwrap();
    music.set_loop_positions_by_frame(1, 3);
    assert_eq!(music.loop_start_frame(), 1);
    assert_eq!(music.loop_end_frame(), 3);

    music.play(true);
    let left: Vec<i16> = handle.capture_frames(8).into_iter().map(|(l, _)| l).collect();
    assert_eq!(left, vec![1, 2, 3, 2, 3, 2, 3, 2]);

    assert!(music.playing());
    assert!(!music.done());
    let events = recorder.music();
    assert_eq!(events[0], MusicAction::Play);
    assert_eq!(events.iter().filter(|&&a| a == MusicAction::Loop).count(), 3);
    assert!(!events.contains(&MusicAction::Stop));

    // Disabling the loop lets playback run off the end
    music.set_loop(false);
    handle.capture_frames(4);
    assert!(music.done());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_invalid_loop_positions_ignored() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, _handle) = capture_engine(scratch.path());
    let music = engine.load_music(constant_source(1, 100), false).unwrap();

    music.set_loop_positions_by_frame(10, 20);
    music.set_loop_positions_by_frame(500, 600);
    assert_eq!((music.loop_start_frame(), music.loop_end_frame()), (10, 20));

    music.set_loop_positions_by_frame(30, 1000);
    assert_eq!((music.loop_start_frame(), music.loop_end_frame()), (30, 100));

    music.set_loop_positions_by_seconds(-1.0, 0.001);
    assert_eq!(music.loop_start_frame(), 30);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_pause_resume_stop() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let music = engine.load_music(pcm_source(&ramp(10)), false).unwrap();

    music.play(false);
    handle.capture_frames(3);
    music.pause();
    assert_eq!(music.position_frames(), 3);
    assert_eq!(handle.capture_frames(2), vec![(0, 0); 2]);

    music.resume();
    assert_eq!(handle.capture_frames(1), vec![(40, -40)]);

    music.stop();
    assert!(!music.playing());
    assert_eq!(music.position_frames(), 0);
    music.play(false);
    assert_eq!(handle.capture_frames(1), vec![(10, -10)]);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_volume_pan_and_global_volume() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let music = engine.load_music(constant_source(10000, 16), false).unwrap();

    engine.set_global_volume(0.5).unwrap();
    engine.set_global_volume(-3.0).unwrap();
    assert_eq!(engine.global_volume(), 0.5);

    music.play_with_volume_and_pan(false, 0.5, 0.5);
    music.set_volume(-1.0);
    music.set_pan(1.5);
    assert_eq!(music.volume(), 0.5);
    assert_eq!(music.pan(), 0.5);

    assert_eq!(handle.capture_frames(2), vec![(1250, 2500); 2]);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_sum_saturates() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let first = engine.load_music(constant_source(30000, 8), false).unwrap();
    let second = engine.load_music(constant_source(30000, 8), false).unwrap();

    first.play(false);
    second.play(false);
    assert_eq!(handle.capture_frames(2), vec![(32767, 32767); 2]);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_streamed_music_matches_memory() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let frames = ramp(50);

    let streamed = engine.load_music(pcm_source(&frames), true).unwrap();
    streamed.set_loop_positions_by_frame(20, 45);
    streamed.play(true);
    let from_file = handle.capture_frames(120);
    streamed.unload();

    let memory = engine.load_music(pcm_source(&frames), false).unwrap();
    memory.set_loop_positions_by_frame(20, 45);
    memory.play(true);
    let from_memory = handle.capture_frames(120);

    assert_eq!(&from_file[..45], &frames[..45]);
    assert_eq!(&from_file[45..70], &frames[20..45]);
    assert_eq!(from_file, from_memory);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_unload_silences_music() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let music = engine.load_music(constant_source(700, 100), false).unwrap();

    music.play(false);
    assert_eq!(handle.capture_frames(2), vec![(700, 700); 2]);
    music.unload();
    assert_eq!(handle.capture_frames(2), vec![(0, 0); 2]);
    engine.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Sounds
// ---------------------------------------------------------------------------

#[test]
#[serial]
fn test_sound_voices_overlap_and_retire() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    engine.register_event_listener(recorder.clone());

    let sound = engine.load_sound(constant_source(1000, 4), false).unwrap();
    assert_eq!(sound.play(), 1);
    assert_eq!(sound.play(), 2);
    assert_eq!(sound.active_voices(), 2);

    let captured = handle.capture_frames(6);
    assert_eq!(&captured[..4], &[(2000, 2000); 4]);
    assert_eq!(&captured[4..], &[(0, 0); 2]);
    assert_eq!(sound.active_voices(), 0);

    let events = recorder.sound();
    for voice in [1, 2] {
        assert!(events.contains(&(voice, SoundAction::Play)));
        assert!(events.contains(&(voice, SoundAction::Stop)));
    }

    // Replaying creates a fresh voice
    assert_eq!(sound.play(), 3);
    assert_eq!(handle.capture_frames(1), vec![(1000, 1000)]);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_streamed_sound_voices_share_file() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let frames = ramp(40);

    let sound = engine.load_sound(pcm_source(&frames), true).unwrap();
    sound.play_with_volume(0.5);
    let first = handle.capture_frames(10);
    sound.play_with_volume(0.5);
    let overlap = handle.capture_frames(30);

    let half = |v: i16| (v as f64 * 0.5).round() as i16;
    assert_eq!(first[0], (half(10), half(-10)));
    // Voice one is at frame 10 when voice two starts at frame 0
    let (l1, _) = frames[10];
    let (l2, _) = frames[0];
    assert_eq!(overlap[0].0, half(l1) + half(l2));
    assert_eq!(sound.active_voices(), 1);

    handle.capture_frames(20);
    assert_eq!(sound.active_voices(), 0);
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_sound_stop_retires_all_voices() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    engine.register_event_listener(recorder.clone());

    let sound = engine.load_sound(constant_source(100, 1000), false).unwrap();
    sound.play_with_volume_and_pan(1.0, -1.0);
    sound.play_with_volume_and_pan(1.0, 1.0);
    assert_eq!(handle.capture_frames(1), vec![(100, 100)]);

    sound.stop();
    assert_eq!(sound.active_voices(), 0);
    assert_eq!(handle.capture_frames(1), vec![(0, 0)]);
    let stops = recorder
        .sound()
        .into_iter()
        .filter(|(_, a)| *a == SoundAction::Stop)
        .count();
    assert_eq!(stops, 2);
    engine.shutdown().unwrap();
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Rewinds its music whenever it stops, from inside the mixing tick
#[derive(Default)]
struct Rewinder {
    music: OnceLock<Arc<Music>>,
    stops: Mutex<usize>,
}

impl EventListener for Rewinder {
    fn on_music_event(&self, event: &MusicEvent) {
        if event.action == MusicAction::Stop {
            *self.stops.lock().unwrap() += 1;
            if let Some(music) = self.music.get() {
                music.rewind();
            }
        }
    }
}

#[test]
#[serial]
fn test_listener_calls_back_into_music() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let rewinder = Arc::new(Rewinder::default());
    engine.register_event_listener(rewinder.clone());

    let music = Arc::new(engine.load_music(constant_source(5, 3), false).unwrap());
    rewinder.music.set(Arc::clone(&music)).unwrap();
    music.play(false);

    handle.capture_frames(5);
    assert_eq!(*rewinder.stops.lock().unwrap(), 1);
    assert_eq!(music.position_frames(), 0);
    assert!(!music.done());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_unregistered_listener_silent() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, handle) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    let listener: Arc<dyn EventListener> = recorder.clone();

    assert!(engine.register_event_listener(Arc::clone(&listener)));
    assert!(!engine.register_event_listener(Arc::clone(&listener)));
    assert!(engine.unregister_event_listener(&listener));
    assert!(!engine.unregister_event_listener(&listener));

    let music = engine.load_music(constant_source(1, 2), false).unwrap();
    music.play(false);
    handle.capture_frames(3);
    assert!(recorder.music().is_empty());
    engine.shutdown().unwrap();
}

#[test]
#[serial]
fn test_shutdown_drops_listeners() {
    let scratch = tempfile::tempdir().unwrap();
    let (engine, _) = capture_engine(scratch.path());
    let recorder = Arc::new(Recorder::default());
    engine.register_event_listener(recorder.clone());
    engine.shutdown().unwrap();

    let (device, handle) = CaptureDevice::new();
    engine.init_with_device(device).unwrap();
    let music = engine.load_music(constant_source(1, 2), false).unwrap();
    music.play(false);
    handle.capture_frames(3);

    assert!(recorder.music().is_empty());
    engine.shutdown().unwrap();
}
