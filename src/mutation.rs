/*!
The Mutation API: add/remove track, add event by delta-pulses / absolute-pulses /
seconds, `add_eot`, and event removal with delta-pulse repair. Grounded on the teacher's
`file/track.rs` push/insert/replace methods, generalized to operate through `&mut Smf` (rather than
a raw recursive back-pointer) so that tempo-map invalidation and renumbering are explicit,
single-owner operations.
!*/

use crate::error::{self, LibResult};
use crate::event::Event;
use crate::logging::LogLevel;
use crate::track::Track;
use crate::{Format, Smf};

impl Smf {
    /// Appends a new, empty track and returns its 1-based track number. Auto-promotes `format`
    /// from `Single` to `Multi` once a second track exists.
    pub fn add_track(&mut self) -> usize {
        let track_number = self.tracks.len() + 1;
        self.tracks.push(Track::new(track_number));
        if self.tracks.len() >= 2 && self.format == Format::Single {
            self.format = Format::Multi;
        }
        track_number
    }

    /// Removes the track at `track_number`, renumbering the remaining tracks `1..N-1` and
    /// rebuilding the tempo map (the removed track may have carried tempo/time-signature events).
    pub fn remove_track(&mut self, track_number: usize) -> crate::Result<()> {
        self.remove_track_inner(track_number).map_err(Into::into)
    }

    fn remove_track_inner(&mut self, track_number: usize) -> LibResult<()> {
        let index = track_index(&self.tracks, track_number)?;
        self.tracks.remove(index);
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.set_track_number(i + 1);
        }
        self.rebuild_tempo_map();
        Ok(())
    }

    /// Appends `midi_buffer` to `track_number` at `delta` pulses after that track's last event
    /// (or song start, if the track is empty). Returns the new event's 1-based event number.
    pub fn add_event_by_delta(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        delta: u32,
    ) -> crate::Result<usize> {
        self.add_event_by_delta_inner(track_number, midi_buffer, delta)
            .map_err(Into::into)
    }

    fn add_event_by_delta_inner(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        delta: u32,
    ) -> LibResult<usize> {
        let index = track_index(&self.tracks, track_number)?;
        let last_pulses = self.tracks[index].last_time_pulses();
        let time_pulses = last_pulses + delta as u64;
        self.insert_event_at(index, midi_buffer, time_pulses)
    }

    /// Inserts `midi_buffer` at absolute `time_pulses`. If `time_pulses` is at or after the
    /// track's current last event, this is an O(1) append; otherwise the event is inserted in
    /// sorted position (ties go after existing events at the same time) and the
    /// whole track's delta-times and event numbers are recomputed.
    pub fn add_event_by_pulses(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        time_pulses: u64,
    ) -> crate::Result<usize> {
        self.add_event_by_pulses_inner(track_number, midi_buffer, time_pulses)
            .map_err(Into::into)
    }

    fn add_event_by_pulses_inner(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        time_pulses: u64,
    ) -> LibResult<usize> {
        let index = track_index(&self.tracks, track_number)?;
        self.insert_event_at(index, midi_buffer, time_pulses)
    }

    /// Converts `time_seconds` to pulses via the tempo map, then behaves as
    /// [`Smf::add_event_by_pulses`].
    pub fn add_event_by_seconds(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        time_seconds: f64,
    ) -> crate::Result<usize> {
        self.add_event_by_seconds_inner(track_number, midi_buffer, time_seconds)
            .map_err(Into::into)
    }

    fn add_event_by_seconds_inner(
        &mut self,
        track_number: usize,
        midi_buffer: Vec<u8>,
        time_seconds: f64,
    ) -> LibResult<usize> {
        let index = track_index(&self.tracks, track_number)?;
        let time_pulses = self.tempo_map.seconds_to_pulses(time_seconds).ok_or_else(|| {
            error::Unsupported {
                site: site!(),
                description: "seconds-based positioning is unsupported for SMPTE-divided songs"
                    .to_string(),
            }
            .build()
        })?;
        self.insert_event_at(index, midi_buffer, time_pulses)
    }

    /// Appends the mandatory `FF 2F 00` End-Of-Track event at `delta=0`.
    pub fn add_eot(&mut self, track_number: usize) -> crate::Result<usize> {
        self.add_event_by_delta(track_number, vec![0xFF, 0x2F, 0x00], 0)
    }

    /// Removes the event at `event_number` on `track_number`. The following event's delta-time
    /// absorbs the removed one's, and subsequent events are
    /// renumbered.
    pub fn remove_event(&mut self, track_number: usize, event_number: usize) -> crate::Result<()> {
        self.remove_event_inner(track_number, event_number)
            .map_err(Into::into)
    }

    fn remove_event_inner(&mut self, track_number: usize, event_number: usize) -> LibResult<()> {
        let index = track_index(&self.tracks, track_number)?;
        let events = self.tracks[index].events_mut();
        let i = event_number.checked_sub(1).filter(|&i| i < events.len()).ok_or_else(|| {
            error::InvalidEvent {
                site: site!(),
                description: format!(
                    "track {} has no event number {}",
                    track_number, event_number
                ),
            }
            .build()
        })?;
        let removed = events.remove(i);
        let was_tempo_event = removed.is_tempo_map_event();
        self.tracks[index].renumber();

        if was_tempo_event {
            self.rebuild_tempo_map();
        }
        Ok(())
    }

    /// Shared insertion logic for the three `add_event_by_*` entry points: appends when sorted
    /// order already holds, otherwise inserts and repairs the whole track.
    fn insert_event_at(
        &mut self,
        index: usize,
        midi_buffer: Vec<u8>,
        time_pulses: u64,
    ) -> LibResult<usize> {
        let mut event = Event::new(midi_buffer, 0);
        let is_tempo_event = event.is_tempo_map_event();
        let track = &mut self.tracks[index];
        let last_pulses = track.last_time_pulses();

        let event_number = if time_pulses >= last_pulses || track.number_of_events() == 0 {
            let delta = time_pulses.saturating_sub(last_pulses);
            event.set_delta_time_pulses(delta as u32);
            event.stamp(time_pulses, track.track_number(), 0);
            track.push_event(event);
            track.number_of_events()
        } else {
            event.stamp(time_pulses, track.track_number(), 0);
            let pos = track
                .events_slice()
                .partition_point(|e| e.time_pulses() <= time_pulses);
            track.events_mut().insert(pos, event);
            track.renumber();
            pos + 1
        };

        if is_tempo_event {
            self.rebuild_tempo_map();
        } else {
            let seconds = self.tempo_map.pulses_to_seconds(time_pulses).unwrap_or(0.0);
            self.tracks[index]
                .events_mut()
                .get_mut(event_number - 1)
                .expect("just inserted")
                .set_time_seconds(seconds);
        }

        Ok(event_number)
    }

    /// Regenerates the tempo map from every track's current event stream and refreshes every
    /// event's cached `time_seconds` to match. Called whenever a tempo/time-signature
    /// event is added, removed, or a whole track carrying one is removed.
    pub(crate) fn rebuild_tempo_map(&mut self) {
        self.log(LogLevel::Debug, "rebuilding tempo map");
        let warnings = self.tempo_map.rebuild(&self.tracks);
        for warning in warnings {
            self.log(LogLevel::Warning, warning);
        }
        self.refresh_time_seconds();
    }

    fn refresh_time_seconds(&mut self) {
        for track in self.tracks.iter_mut() {
            for event in track.events_mut().iter_mut() {
                let seconds = self.tempo_map.pulses_to_seconds(event.time_pulses()).unwrap_or(0.0);
                event.set_time_seconds(seconds);
            }
        }
    }
}

fn track_index(tracks: &[Track], track_number: usize) -> LibResult<usize> {
    track_number
        .checked_sub(1)
        .filter(|&i| i < tracks.len())
        .ok_or_else(|| {
            error::InvalidEvent {
                site: site!(),
                description: format!("no track numbered {}", track_number),
            }
            .build()
        })
}
