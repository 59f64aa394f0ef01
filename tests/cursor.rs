use midi_smf::Smf;

fn two_track_song() -> Smf {
    let mut smf = Smf::new();
    smf.add_track();
    smf.add_track();
    smf.add_event_by_delta(1, vec![0x90, 0x3C, 0x40], 0).unwrap();
    smf.add_event_by_delta(1, vec![0x80, 0x3C, 0x40], 240).unwrap();
    smf.add_eot(1).unwrap();
    smf.add_event_by_delta(2, vec![0x90, 0x40, 0x40], 120).unwrap();
    smf.add_eot(2).unwrap();
    smf
}

#[test]
fn next_event_walks_every_event_across_tracks_in_time_order() {
    let mut smf = two_track_song();
    smf.rewind();
    let mut seen = Vec::new();
    while let Some(event) = smf.next_event() {
        seen.push((event.time_pulses(), event.track_number()));
    }
    assert_eq!(
        vec![(0, 1), (120, 2), (120, 2), (240, 1), (240, 1)],
        seen
    );
}

#[test]
fn peek_next_event_does_not_advance() {
    let mut smf = two_track_song();
    smf.rewind();
    let peeked = smf.peek_next_event().unwrap();
    let next = smf.next_event().unwrap();
    assert_eq!(peeked, next);
    assert_eq!(0, peeked.time_pulses());
}

#[test]
fn seek_to_seconds_positions_before_the_target_time() {
    let mut smf = Smf::new_with_ppqn(480);
    smf.add_track();
    smf.add_event_by_delta(1, vec![0x90, 0x3C, 0x40], 0).unwrap();
    smf.add_event_by_delta(1, vec![0x90, 0x40, 0x40], 480).unwrap();
    smf.add_eot(1).unwrap();

    smf.seek_to_seconds(0.3).unwrap();
    let event = smf.next_event().unwrap();
    assert_eq!(480, event.time_pulses());
}

#[test]
fn seeking_past_the_last_event_is_an_error() {
    let mut smf = two_track_song();
    assert!(smf.seek_to_seconds(1_000.0).is_err());
}
