/*!
The Playback Cursor: a per-track "next event index" plus a minimum-time scan across
tracks to produce the merged event stream. No direct teacher analogue (`webern-midi_file` has no
playback concept); grounded on the multi-track min-time merge pattern used by the
rustysynth-derived MIDI file reader in the retrieval pack, adapted to this crate's index-based
track ownership.
!*/

use crate::error;
use crate::event::Event;
use crate::Smf;

impl Smf {
    /// Resets every track's cursor to its first event (or "exhausted", if the track is empty) and
    /// sets `last_seek_seconds` to zero. Does not touch the tempo map.
    pub fn rewind(&mut self) {
        for track in self.tracks.iter_mut() {
            track.rewind_cursor();
        }
        self.last_seek_seconds = Some(0.0);
    }

    /// The next event in merge order, without advancing any cursor. Ties between tracks with
    /// equal `time_pulses` favor the lower track number.
    pub fn peek_next_event(&self) -> Option<Event> {
        self.tracks
            .iter()
            .filter_map(|t| t.cursor_event())
            .min_by_key(|e| (e.time_pulses(), e.track_number()))
            .cloned()
    }

    /// Returns the next event in merge order and advances that track's cursor.
    /// Invalidates `last_seek_seconds`.
    pub fn next_event(&mut self) -> Option<Event> {
        let winner_track = self
            .tracks
            .iter()
            .filter(|t| !t.is_cursor_exhausted())
            .min_by_key(|t| {
                let e = t.cursor_event().expect("filtered to non-exhausted tracks");
                (e.time_pulses(), e.track_number())
            })
            .map(|t| t.track_number())?;

        let index = winner_track - 1;
        let event = self.tracks[index].cursor_event().cloned();
        self.tracks[index].advance_cursor();
        self.last_seek_seconds = None;
        event
    }

    /// Seeks to the first event at or after `time_seconds`, idempotent when called again with the
    /// same `time_seconds` without an intervening cursor operation.
    pub fn seek_to_seconds(&mut self, time_seconds: f64) -> crate::Result<()> {
        if self.last_seek_seconds == Some(time_seconds) {
            return Ok(());
        }
        self.rewind();
        loop {
            match self.peek_next_event() {
                None => {
                    return error::SeekPastEnd { site: site!() }.fail().map_err(Into::into);
                }
                Some(event) if event.time_seconds() >= time_seconds => break,
                Some(_) => {
                    self.next_event();
                }
            }
        }
        self.last_seek_seconds = Some(time_seconds);
        Ok(())
    }

    /// Seeks until `peek_next_event` would return `target`. Leaves the cursor positioned so that
    /// `target` is the *next* event, not yet consumed.
    pub fn seek_to_event(&mut self, target: &Event) -> crate::Result<()> {
        self.rewind();
        loop {
            match self.peek_next_event() {
                None => return error::EventNotInSong { site: site!() }.fail().map_err(Into::into),
                Some(event) if &event == target => return Ok(()),
                Some(_) => {
                    self.next_event();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Smf;

    fn tempo_song() -> Smf {
        // a song with two tempo changes, used to test seek-to-seconds against the tempo map.
        let mut smf = Smf::new_with_ppqn(480);
        smf.add_track();
        smf.add_event_by_delta(1, vec![0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20], 0).unwrap();
        smf.add_event_by_delta(1, vec![0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40], 960).unwrap();
        smf.add_event_by_delta(1, vec![0x90, 0x3C, 0x7F], 480).unwrap();
        smf.add_eot(1).unwrap();
        smf
    }

    #[test]
    fn next_event_merges_across_tracks_by_time_then_track_number() {
        let mut smf = Smf::new();
        smf.add_track();
        smf.add_track();
        smf.add_event_by_delta(1, vec![0x90, 0x3C, 0x40], 10).unwrap();
        smf.add_event_by_delta(2, vec![0x90, 0x40, 0x40], 0).unwrap();
        smf.add_event_by_pulses(2, vec![0x90, 0x41, 0x40], 10).unwrap();
        smf.rewind();
        let first = smf.next_event().unwrap();
        assert_eq!(0, first.time_pulses());
        assert_eq!(2, first.track_number());
        let second = smf.next_event().unwrap();
        assert_eq!(10, second.time_pulses());
        assert_eq!(1, second.track_number());
        let third = smf.next_event().unwrap();
        assert_eq!(10, third.time_pulses());
        assert_eq!(2, third.track_number());
        assert!(smf.next_event().is_none());
    }

    #[test]
    fn seek_and_rewind_scenario() {
        let mut smf = tempo_song();
        smf.seek_to_seconds(1.5).unwrap();
        let event = smf.next_event().unwrap();
        assert_eq!(vec![0x90, 0x3C, 0x7F], event.midi_buffer());
        smf.rewind();
        let first = smf.next_event().unwrap();
        assert_eq!(0, first.time_pulses());
        assert_eq!(vec![0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20], first.midi_buffer());
    }

    #[test]
    fn seek_to_seconds_is_idempotent() {
        let mut smf = tempo_song();
        smf.seek_to_seconds(1.5).unwrap();
        let first_peek = smf.peek_next_event();
        smf.seek_to_seconds(1.5).unwrap();
        let second_peek = smf.peek_next_event();
        assert_eq!(first_peek, second_peek);
    }

    #[test]
    fn seek_past_end_is_an_error() {
        let mut smf = tempo_song();
        assert!(smf.seek_to_seconds(1_000_000.0).is_err());
    }

    #[test]
    fn seek_to_event_finds_target_without_consuming_it() {
        let mut smf = tempo_song();
        let target = smf.get_track_by_number(1).unwrap().event(3).unwrap().clone();
        smf.seek_to_event(&target).unwrap();
        assert_eq!(Some(target.clone()), smf.peek_next_event());
        assert_eq!(Some(target), smf.next_event());
    }

    #[test]
    fn seek_to_event_not_in_song_is_an_error() {
        let mut smf = tempo_song();
        let foreign = crate::Event::new(vec![0x80, 0x00, 0x00], 0);
        assert!(smf.seek_to_event(&foreign).is_err());
    }
}
