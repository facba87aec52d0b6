//! Engine integration tests: loading, transport, events, and downloads
//!
//! All tests run headless on a NullOutput driver.

mod common;

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use common::*;
use tonedeck_engine::events::{EngineEvent, PlaybackState};
use tonedeck_engine::{EngineConfig, Error};

#[tokio::test]
async fn test_load_reports_duration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_seconds.wav");
    write_sine_wav(&path, 2 * TEST_RATE, TEST_RATE);

    let engine = test_engine();
    let mut events = engine.subscribe_events();

    engine.load_track(&path).await.unwrap();

    let events = drain_events(&mut events);
    let durations: Vec<f32> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::TrackDurationChanged { seconds, .. } => Some(*seconds),
            _ => None,
        })
        .collect();

    assert_eq!(durations.len(), 1);
    assert!((durations[0] - 2.0).abs() < 1e-3);
    assert_eq!(engine.track_duration().await, Some(durations[0]));
}

#[tokio::test]
async fn test_ten_second_track_reports_ten_seconds() {
    // 441000 frames at 44100 Hz is exactly 10 seconds
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ten_seconds.wav");
    write_sine_wav(&path, 441000, TEST_RATE);

    let engine = test_engine();
    engine.load_track(&path).await.unwrap();

    assert_eq!(engine.track_duration().await, Some(10.0));
}

#[tokio::test]
async fn test_second_load_fully_replaces_first() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.wav");
    let second = dir.path().join("second.wav");
    write_sine_wav(&first, 2 * TEST_RATE, TEST_RATE);
    write_sine_wav(&second, 5 * TEST_RATE, TEST_RATE);

    let engine = test_engine();
    let mut events = engine.subscribe_events();

    engine.load_track(&first).await.unwrap();
    engine.play_pause().await.unwrap();
    render(&engine, 100);

    engine.load_track(&second).await.unwrap();

    // New duration reported, new schedule positioned at the start
    assert_eq!(engine.track_duration().await, Some(5.0));
    assert_eq!(engine.position_seconds(), Some(0.0));
    engine.graph().with_core(|core| {
        assert_eq!(
            core.player.track().unwrap().frame_count,
            5 * TEST_RATE as u64
        );
    });

    let duration_events = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::TrackDurationChanged { .. }))
        .count();
    assert_eq!(duration_events, 2);
}

#[tokio::test]
async fn test_failed_load_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.wav");
    write_sine_wav(&good, 2 * TEST_RATE, TEST_RATE);

    let engine = test_engine();
    engine.load_track(&good).await.unwrap();

    let mut events = engine.subscribe_events();
    let missing = dir.path().join("missing.wav");
    let result = engine.load_track(&missing).await;

    assert!(matches!(result, Err(Error::Decode(_))));
    // Prior track stays active, no new duration event fires
    assert_eq!(engine.track_duration().await, Some(2.0));
    assert!(drain_events(&mut events).is_empty());
    engine.graph().with_core(|core| {
        assert_eq!(core.player.track().unwrap().path, good);
    });
}

#[tokio::test]
async fn test_corrupt_file_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.wav");
    std::fs::write(&path, b"this is not audio").unwrap();

    let engine = test_engine();
    let result = engine.load_track(&path).await;
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn test_play_pause_toggles_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.wav");
    write_sine_wav(&path, TEST_RATE, TEST_RATE);

    let engine = test_engine();
    engine.load_track(&path).await.unwrap();

    let mut events = engine.subscribe_events();

    engine.play_pause().await.unwrap();
    assert_eq!(engine.playback_state().await, PlaybackState::Playing);

    engine.play_pause().await.unwrap();
    assert_eq!(engine.playback_state().await, PlaybackState::Paused);

    engine.play_pause().await.unwrap();
    assert_eq!(engine.playback_state().await, PlaybackState::Playing);

    let states: Vec<PlaybackState> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::PlaybackStateChanged { new_state, .. } => Some(new_state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Playing,
        ]
    );
}

#[tokio::test]
async fn test_toggle_flips_even_without_track() {
    let engine = test_engine();
    let mut events = engine.subscribe_events();

    engine.play_pause().await.unwrap();

    // The flag flips and reports although nothing is scheduled
    assert_eq!(engine.playback_state().await, PlaybackState::Playing);
    assert_eq!(drain_events(&mut events).len(), 1);
    assert!(all_silent(&render(&engine, 64)));
}

#[tokio::test]
async fn test_stop_is_idempotent_and_always_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.wav");
    write_sine_wav(&path, TEST_RATE, TEST_RATE);

    let engine = test_engine();
    engine.load_track(&path).await.unwrap();
    engine.play_pause().await.unwrap();

    let mut events = engine.subscribe_events();

    engine.stop().await.unwrap();
    engine.stop().await.unwrap();

    let states: Vec<PlaybackState> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::PlaybackStateChanged { new_state, .. } => Some(new_state),
            _ => None,
        })
        .collect();

    // Both stops emit, both land on Stopped
    assert_eq!(states, vec![PlaybackState::Stopped, PlaybackState::Stopped]);
    assert_eq!(engine.playback_state().await, PlaybackState::Stopped);
}

#[tokio::test]
async fn test_download_failure_pairs_wait_events_and_keeps_track() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.wav");
    write_sine_wav(&good, 2 * TEST_RATE, TEST_RATE);

    let mut config = EngineConfig::default();
    config.download_dir = Some(dir.path().join("downloads"));
    let engine = test_engine_with_config(config);
    engine.load_track(&good).await.unwrap();

    let mut events = engine.subscribe_events();

    // Discard port: connection refused
    let result = engine
        .download_and_load("http://127.0.0.1:9/track.mp3")
        .await;
    assert!(matches!(result, Err(Error::Download(_))));

    let waits: Vec<bool> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::DownloadWaitChanged { waiting, .. } => Some(waiting),
            _ => None,
        })
        .collect();

    // Wait-started and wait-ended both fire in the failure branch
    assert_eq!(waits, vec![true, false]);
    // Prior track untouched
    assert_eq!(engine.track_duration().await, Some(2.0));
}

/// Minimal one-shot HTTP server for download tests
async fn serve_bytes_once(body: Vec<u8>, content_type: &'static str) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                content_type,
                body.len()
            );
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

#[tokio::test]
async fn test_download_and_load_success() {
    let body = sine_wav_bytes(2 * TEST_RATE, TEST_RATE);
    let addr = serve_bytes_once(body, "audio/wav").await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.download_dir = Some(dir.path().to_path_buf());
    let engine = test_engine_with_config(config);

    let mut events = engine.subscribe_events();

    let url = format!("http://{}/track.wav", addr);
    engine.download_and_load(&url).await.unwrap();

    let events = drain_events(&mut events);

    let waits: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::DownloadWaitChanged { waiting, .. } => Some(*waiting),
            _ => None,
        })
        .collect();
    assert_eq!(waits, vec![true, false]);

    // Wait-start carries the display message
    let message = events
        .iter()
        .find_map(|e| match e {
            EngineEvent::DownloadWaitChanged {
                message,
                waiting: true,
                ..
            } => Some(message.clone()),
            _ => None,
        })
        .unwrap();
    assert!(!message.is_empty());

    // The downloaded track loaded and reported its duration
    assert_eq!(engine.track_duration().await, Some(2.0));
}

#[tokio::test]
async fn test_concurrent_control_calls_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.wav");
    write_sine_wav(&path, 2 * TEST_RATE, TEST_RATE);

    let engine = Arc::new(test_engine());
    engine.load_track(&path).await.unwrap();
    engine.play_pause().await.unwrap();
    render(&engine, 100);

    let mut handles = Vec::new();
    for i in 0..24 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            match i % 6 {
                0 => {
                    engine.play_pause().await.unwrap();
                }
                1 => {
                    engine.seek_to(i as f32 / 24.0).await.unwrap();
                }
                2 => {
                    engine.seek_by(1.0).await.unwrap();
                }
                3 => engine.set_playback_speed(0.5 + i as f32 / 24.0),
                4 => engine.set_reverb_effect("cathedral"),
                _ => {
                    engine.stop().await.unwrap();
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Whatever interleaving happened, the engine still answers coherently
    engine.stop().await.unwrap();
    assert_eq!(engine.playback_state().await, PlaybackState::Stopped);
    render(&engine, 256);

    engine.seek_to(0.5).await.unwrap();
    engine.play_pause().await.unwrap();
    assert_eq!(engine.playback_state().await, PlaybackState::Playing);
    render(&engine, 100);
    assert!(engine.position_seconds().unwrap() > 0.9);
}
