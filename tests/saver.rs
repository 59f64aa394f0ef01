mod utils;

use midi_smf::Smf;
use tempfile::tempdir;
use utils::{enable_logging, minimal_smf_bytes};

#[test]
fn round_trips_a_loaded_file_byte_for_byte() {
    enable_logging();
    let bytes = minimal_smf_bytes();
    let smf = Smf::load_from_memory(&bytes).unwrap();
    let saved = smf.save_to_memory().unwrap();
    assert_eq!(bytes, saved);
}

#[test]
fn saves_to_a_file_on_disk_and_reloads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.mid");

    let mut smf = Smf::new_with_ppqn(96);
    smf.add_track();
    smf.add_event_by_delta(1, vec![0x90, 0x3C, 0x7F], 0).unwrap();
    smf.add_eot(1).unwrap();
    smf.save(&path).unwrap();

    let reloaded = Smf::load(&path).unwrap();
    assert_eq!(1, reloaded.tracks_len());
    let track = reloaded.get_track_by_number(1).unwrap();
    assert_eq!(2, track.number_of_events());
}

#[test]
fn a_freshly_constructed_song_with_a_track_and_eot_saves_cleanly() {
    let mut smf = Smf::new();
    smf.add_track();
    smf.add_eot(1).unwrap();
    assert!(smf.save_to_memory().is_ok());
}

#[test]
fn a_song_with_no_tracks_fails_to_save() {
    let smf = Smf::new();
    assert!(smf.save_to_memory().is_err());
}
