mod utils;

use midi_smf::Smf;
use tempfile::tempdir;
use utils::{enable_logging, minimal_smf_bytes};

#[test]
fn loads_a_minimal_file_from_memory() {
    enable_logging();
    let smf = Smf::load_from_memory(&minimal_smf_bytes()).unwrap();
    assert_eq!(1, smf.tracks_len());
    let track = smf.get_track_by_number(1).unwrap();
    assert_eq!(2, track.number_of_events());
    assert!(track.last_event().unwrap().is_end_of_track());
}

#[test]
fn loads_from_a_file_on_disk() {
    enable_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("minimal.mid");
    std::fs::write(&path, minimal_smf_bytes()).unwrap();
    let smf = Smf::load(&path).unwrap();
    assert_eq!(1, smf.tracks_len());
}

#[test]
fn missing_file_is_an_error() {
    let result = Smf::load("/nonexistent/path/does-not-exist.mid");
    assert!(result.is_err());
}

#[test]
fn truncated_header_is_an_error() {
    let bytes: &[u8] = &[0x4D, 0x54, 0x68, 0x64, 0x00, 0x00];
    assert!(Smf::load_from_memory(bytes).is_err());
}

#[test]
fn realtime_splice_carries_the_delta_and_the_main_event_does_not() {
    // delta=96, NoteOn status, data byte 0x3C, a realtime clock byte spliced in, then the
    // remaining data byte 0x40; delta=0 EndOfTrack.
    let mut bytes = vec![
        0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x01, 0x00, 0x60,
    ];
    let body: &[u8] = &[0x60, 0x90, 0x3C, 0xF8, 0x40, 0x00, 0xFF, 0x2F, 0x00];
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);

    let smf = Smf::load_from_memory(&bytes).unwrap();
    let track = smf.get_track_by_number(1).unwrap();
    assert_eq!(3, track.number_of_events());

    let splice = track.event(1).unwrap();
    assert_eq!(vec![0xF8], splice.midi_buffer());
    assert_eq!(96, splice.delta_time_pulses());
    assert_eq!(96, splice.time_pulses());

    let note_on = track.event(2).unwrap();
    assert_eq!(vec![0x90, 0x3C, 0x40], note_on.midi_buffer());
    assert_eq!(0, note_on.delta_time_pulses());
    assert_eq!(96, note_on.time_pulses());

    let eot = track.event(3).unwrap();
    assert!(eot.is_end_of_track());
    assert_eq!(0, eot.delta_time_pulses());
    assert_eq!(96, eot.time_pulses());

    // the §8 invariant: every event's absolute pulses equals the previous event's plus its own
    // delta.
    let mut previous = 0u64;
    for event in track.events() {
        assert_eq!(previous + event.delta_time_pulses() as u64, event.time_pulses());
        previous = event.time_pulses();
    }
}

#[test]
fn multi_track_file_reports_format_and_track_count() {
    let bytes: &[u8] = &[
        0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x02, 0x00, 0x60, 0x4D,
        0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x04, 0x00, 0xFF, 0x2F, 0x00, 0x4D, 0x54, 0x72, 0x6B,
        0x00, 0x00, 0x00, 0x04, 0x00, 0xFF, 0x2F, 0x00,
    ];
    let smf = Smf::load_from_memory(bytes).unwrap();
    assert_eq!(midi_smf::Format::Multi, smf.format());
    assert_eq!(2, smf.tracks_len());
}
