//! End-to-end engine scenarios: persistence round trips, recording
//! lifecycle, and source loading through the software substrate.

use divisi::prelude::*;
use divisi::{Error, SoftwareSubstrate};
use std::sync::Arc;

fn engine_with_substrate() -> (Arc<SoftwareSubstrate>, AudioEngine) {
    let substrate = Arc::new(SoftwareSubstrate::new());
    let engine = AudioEngine::builder()
        .substrate(substrate.clone() as Arc<dyn Substrate>)
        .build()
        .unwrap();
    (substrate, engine)
}

fn populated_engine() -> (Arc<SoftwareSubstrate>, AudioEngine, TrackId, TrackId) {
    let (substrate, mut engine) = engine_with_substrate();

    let guitar = engine.add_track(TrackConfig::audio("guitar")).unwrap();
    let keys = engine
        .add_track(TrackConfig::midi("keys").synth_type("fm").color("#00ff00"))
        .unwrap();

    engine.set_volume(guitar, -6.0).unwrap();
    engine.set_pan(guitar, 0.5).unwrap();
    engine.set_mute(keys, true).unwrap();
    engine.set_armed(guitar, true).unwrap();
    engine.set_tempo(96.0).unwrap();
    engine.set_loop(true, 2.0, 10.0).unwrap();
    engine.master_mut().set_volume(-3.0).unwrap();

    engine.create_send_bus("verb", "reverb").unwrap();
    engine.set_send_wet_dry("verb", 0.4).unwrap();
    engine.route_to_send(guitar, "verb", 0.3).unwrap();

    engine
        .add_note(keys, NoteEvent::new(60, 0.0, 1.0, 0.8))
        .unwrap();
    engine
        .add_note(keys, NoteEvent::new(64, 1.0, 0.5, 0.6))
        .unwrap();

    (substrate, engine, guitar, keys)
}

#[tokio::test]
async fn test_project_round_trip_restores_state_by_id() {
    let (_, engine, guitar, keys) = populated_engine();
    let data = engine.save_project().unwrap();

    let (_, mut restored) = engine_with_substrate();
    restored.load_project(data).await.unwrap();

    assert_eq!(restored.track_ids(), vec![guitar, keys]);
    let g = restored.track(guitar).unwrap();
    assert_eq!(g.name(), "guitar");
    assert_eq!(g.volume_db(), -6.0);
    assert_eq!(g.pan(), 0.5);
    assert!(g.is_armed());
    assert_eq!(g.track_type(), TrackType::Audio);

    let k = restored.track(keys).unwrap();
    assert_eq!(k.color(), "#00ff00");
    assert!(k.is_muted());
    assert_eq!(k.synth_type().unwrap(), "fm");
    assert_eq!(restored.notes(keys).unwrap().len(), 2);
    assert_eq!(restored.notes(keys).unwrap()[1].pitch, 64);

    assert_eq!(restored.tempo(), 96.0);
    assert!(restored.loop_region().enabled);
    assert_eq!(restored.loop_region().end, 10.0);
    assert_eq!(restored.master().volume(), -3.0);

    assert_eq!(restored.send_bus_names(), vec!["verb".to_string()]);
    assert_eq!(restored.send_bus("verb").unwrap().wet_dry(), 0.4);
    assert!((restored.send_amount(guitar, "verb").unwrap() - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn test_id_allocation_continues_after_load() {
    let (_, engine, _, keys) = populated_engine();
    let data = engine.save_project().unwrap();

    let (_, mut restored) = engine_with_substrate();
    restored.load_project(data).await.unwrap();
    let fresh = restored.add_track(TrackConfig::audio("new")).unwrap();
    assert!(fresh > keys);
}

#[tokio::test]
async fn test_json_round_trip() {
    let (_, engine, guitar, _) = populated_engine();
    let json = engine.serialize_project().unwrap();

    let (_, mut restored) = engine_with_substrate();
    restored.deserialize_project(&json).await.unwrap();
    assert_eq!(restored.track(guitar).unwrap().volume_db(), -6.0);
}

#[tokio::test]
async fn test_unsupported_version_rejected() {
    let (_, engine, _, _) = populated_engine();
    let mut data = engine.save_project().unwrap();
    data.version = "0.9".into();

    let (_, mut restored) = engine_with_substrate();
    assert!(matches!(
        restored.load_project(data).await,
        Err(Error::UnsupportedProjectVersion(_))
    ));
    // The failed load touched nothing
    assert_eq!(restored.track_count(), 0);
}

#[tokio::test]
async fn test_load_replaces_existing_state() {
    let (_, engine, _, _) = populated_engine();
    let data = engine.save_project().unwrap();

    let (_substrate, mut other, _guitar, _keys) = populated_engine();
    other.create_send_bus("slap", "delay").unwrap();
    other.load_project(data).await.unwrap();

    assert_eq!(other.track_count(), 2);
    assert_eq!(other.send_bus_names(), vec!["verb".to_string()]);
}

#[tokio::test]
async fn test_load_audio_and_source_persistence() {
    let (substrate, mut engine) = engine_with_substrate();
    substrate.register_content("riff.wav", SampleBuffer::silent(44_100, 2, 2.5));
    let id = engine.add_track(TrackConfig::audio("a")).unwrap();

    engine.load_audio(id, "riff.wav").await.unwrap();
    assert!((engine.track(id).unwrap().duration() - 2.5).abs() < 1e-6);

    let data = engine.save_project().unwrap();
    let (restored_sub, mut restored) = engine_with_substrate();
    restored_sub.register_content("riff.wav", SampleBuffer::silent(44_100, 2, 2.5));
    restored.load_project(data).await.unwrap();
    assert!((restored.track(id).unwrap().duration() - 2.5).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_source_leaves_track_unbound() {
    let (substrate, mut engine) = engine_with_substrate();
    substrate.register_content("riff.wav", SampleBuffer::silent(44_100, 2, 1.0));
    let id = engine.add_track(TrackConfig::audio("a")).unwrap();
    engine.load_audio(id, "riff.wav").await.unwrap();

    let data = engine.save_project().unwrap();
    // Restore into a substrate that cannot resolve the reference
    let (_, mut restored) = engine_with_substrate();
    restored.load_project(data).await.unwrap();

    assert_eq!(restored.track(id).unwrap().duration(), 0.0);
    assert!(restored.track(id).unwrap().source().is_none());
}

#[tokio::test]
async fn test_recording_lifecycle_drives_transport() {
    let (substrate, mut engine) = engine_with_substrate();
    let id = engine.add_track(TrackConfig::audio("mic")).unwrap();

    assert!(matches!(
        engine.stop_recording(id).await,
        Err(Error::NotRecording)
    ));

    engine.start_recording(id, None).await.unwrap();
    assert_eq!(engine.transport_state(), TransportState::Recording);
    assert!(engine.track(id).unwrap().is_recording());
    assert!(matches!(
        engine.start_recording(id, None).await,
        Err(Error::AlreadyRecording)
    ));

    substrate.feed_input(&[0.5f32; 8820]); // 0.1s of stereo input
    engine.stop_recording(id).await.unwrap();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert!(!engine.track(id).unwrap().is_recording());
    // The take is bound as the playback source
    assert!((engine.track(id).unwrap().duration() - 0.1).abs() < 1e-6);
}

#[tokio::test]
async fn test_recording_requires_audio_track() {
    let (_, mut engine) = engine_with_substrate();
    let keys = engine.add_track(TrackConfig::midi("keys")).unwrap();
    assert!(matches!(
        engine.start_recording(keys, None).await,
        Err(Error::NotAudioTrack(_))
    ));
}

#[tokio::test]
async fn test_export_blocked_while_recording() {
    let (_, mut engine) = engine_with_substrate();
    let id = engine.add_track(TrackConfig::audio("mic")).unwrap();
    engine.start_recording(id, None).await.unwrap();

    assert!(matches!(
        engine.export(&ExportOptions::wav()).await,
        Err(Error::AlreadyRecording)
    ));
}

#[test]
fn test_remove_send_bus_detaches_tracks() {
    let (substrate, mut engine) = engine_with_substrate();
    let id = engine.add_track(TrackConfig::audio("a")).unwrap();
    engine.create_send_bus("verb", "reverb").unwrap();
    engine.route_to_send(id, "verb", 0.5).unwrap();
    let before = substrate.node_count();

    engine.remove_send_bus("verb").unwrap();
    // Bus (4 nodes) and the track's send gain are all released
    assert_eq!(substrate.node_count(), before - 5);
    assert!(engine.track(id).unwrap().send_names().is_empty());
}

#[test]
fn test_remove_track_releases_send_routes() {
    let (substrate, mut engine) = engine_with_substrate();
    engine.create_send_bus("verb", "reverb").unwrap();
    let id = engine.add_track(TrackConfig::audio("a")).unwrap();
    engine.route_to_send(id, "verb", 0.5).unwrap();
    let before = substrate.node_count();

    engine.remove_track(id).unwrap();
    // Strip (4 nodes) plus the send gain are released; the bus survives
    assert_eq!(substrate.node_count(), before - 5);
    assert_eq!(engine.send_bus_names(), vec!["verb".to_string()]);
}
