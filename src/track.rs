/*!
The `Track` value type: an ordered sequence of events owned by an [`crate::Smf`], plus the
per-track playback-cursor state. Grounded on the teacher's `file/track.rs`
(a `Vec`-backed event list with push/insert helpers), generalized from typed `push_note_on`-style
helpers to the raw-buffer events this crate stores.
!*/

use crate::event::Event;

/// One track (`MTrk` chunk) of a song: an ordered list of events, sorted by absolute pulses with
/// ties broken by insertion order.
///
/// A `Track` never outlives the [`crate::Smf`] that owns it; all of its mutation goes through the
/// mutation API (`Smf::add_event_by_*`, `Smf::remove_event`, ...), which is the only code
/// positioned to repair delta-times, renumber events, and invalidate the tempo map.
#[derive(Clone, Debug, Default)]
pub struct Track {
    track_number: usize,
    events: Vec<Event>,
    cursor: Option<usize>,
}

impl Track {
    pub(crate) fn new(track_number: usize) -> Self {
        Self {
            track_number,
            events: Vec::new(),
            cursor: None,
        }
    }

    /// 1-based position of this track within its song.
    pub fn track_number(&self) -> usize {
        self.track_number
    }

    pub(crate) fn set_track_number(&mut self, track_number: usize) {
        self.track_number = track_number;
        for (i, event) in self.events.iter_mut().enumerate() {
            event.stamp(event.time_pulses(), track_number, i + 1);
        }
    }

    /// Number of events currently on this track.
    pub fn number_of_events(&self) -> usize {
        self.events.len()
    }

    /// All events, in ascending `time_pulses` order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// The event at 1-based `event_number`, if any.
    pub fn event(&self, event_number: usize) -> Option<&Event> {
        event_number
            .checked_sub(1)
            .and_then(|i| self.events.get(i))
    }

    /// The last event on the track (by insertion/sort position), if any.
    pub fn last_event(&self) -> Option<&Event> {
        self.events.last()
    }

    pub(crate) fn last_time_pulses(&self) -> u64 {
        self.events.last().map(|e| e.time_pulses()).unwrap_or(0)
    }

    pub(crate) fn events_mut(&mut self) -> &mut Vec<Event> {
        &mut self.events
    }

    pub(crate) fn events_slice(&self) -> &[Event] {
        &self.events
    }

    /// Appends `event` (already stamped with its absolute pulses) at the end of this track and
    /// assigns it the next event number. Used by the loader, where events always arrive in
    /// ascending pulse order.
    pub(crate) fn push_event(&mut self, mut event: Event) {
        let event_number = self.events.len() + 1;
        let time_pulses = event.time_pulses();
        event.stamp(time_pulses, self.track_number, event_number);
        self.events.push(event);
    }

    /// Renumbers every event 1..N and recomputes delta-times from the (already sorted)
    /// `time_pulses` sequence. Called after any structural change: insertion out of order or
    /// removal.
    pub(crate) fn renumber(&mut self) {
        let mut previous_pulses = 0u64;
        for (i, event) in self.events.iter_mut().enumerate() {
            let time_pulses = event.time_pulses();
            let delta = if i == 0 {
                time_pulses
            } else {
                time_pulses - previous_pulses
            };
            event.set_delta_time_pulses(delta as u32);
            event.stamp(time_pulses, self.track_number, i + 1);
            previous_pulses = time_pulses;
        }
    }

    // --- playback cursor state ---

    pub(crate) fn rewind_cursor(&mut self) {
        self.cursor = if self.events.is_empty() { None } else { Some(0) };
    }

    pub(crate) fn cursor_event(&self) -> Option<&Event> {
        self.cursor.and_then(|i| self.events.get(i))
    }

    pub(crate) fn advance_cursor(&mut self) {
        if let Some(i) = self.cursor {
            let next = i + 1;
            self.cursor = if next < self.events.len() {
                Some(next)
            } else {
                None
            };
        }
    }

    pub(crate) fn is_cursor_exhausted(&self) -> bool {
        self.cursor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(time_pulses: u64, delta: u32) -> Event {
        let mut e = Event::new(vec![0x90, 0x3C, 0x40], delta);
        e.stamp(time_pulses, 1, 0);
        e
    }

    #[test]
    fn push_event_assigns_sequential_event_numbers() {
        let mut t = Track::new(1);
        t.push_event(ev(0, 0));
        t.push_event(ev(96, 96));
        assert_eq!(1, t.event(1).unwrap().event_number());
        assert_eq!(2, t.event(2).unwrap().event_number());
    }

    #[test]
    fn renumber_recomputes_deltas_from_sorted_pulses() {
        let mut t = Track::new(1);
        t.push_event(ev(10, 10));
        t.push_event(ev(30, 20));
        t.push_event(ev(70, 40));
        // simulate removing the middle event directly, then repair via renumber.
        t.events.remove(1);
        t.renumber();
        assert_eq!(10, t.event(1).unwrap().delta_time_pulses());
        assert_eq!(60, t.event(2).unwrap().delta_time_pulses());
    }

    #[test]
    fn cursor_rewind_and_advance() {
        let mut t = Track::new(1);
        assert!(t.events.is_empty());
        t.rewind_cursor();
        assert!(t.is_cursor_exhausted());
        t.push_event(ev(0, 0));
        t.push_event(ev(10, 10));
        t.rewind_cursor();
        assert!(!t.is_cursor_exhausted());
        assert_eq!(0, t.cursor_event().unwrap().time_pulses());
        t.advance_cursor();
        assert_eq!(10, t.cursor_event().unwrap().time_pulses());
        t.advance_cursor();
        assert!(t.is_cursor_exhausted());
    }
}
