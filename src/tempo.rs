/*!
The tempo map: an ordered list of anchor points translating between pulses and
seconds across tempo (`FF 51 03`) and time-signature (`FF 58 04`) changes.

No direct teacher analogue — `webern-midi_file` never implements a pulses-to-seconds conversion.
Grounded on the general tempo-track-scan approach used by the rustysynth-derived MIDI file reader
in the retrieval pack (a single pass recording tempo changes, then a merge across tracks),
adapted here to the spec's explicit anchor-list design.
!*/

use crate::track::Track;
use log::warn;

/// A point in the song where tempo and/or time signature take effect. Adjacent anchors define a
/// linear pulses-to-seconds segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoAnchor {
    time_pulses: u64,
    time_seconds: f64,
    microseconds_per_quarter_note: u32,
    numerator: u8,
    denominator: u8,
    clocks_per_click: u8,
    notes_per_note: u8,
}

impl TempoAnchor {
    fn default_at(time_pulses: u64) -> Self {
        Self {
            time_pulses,
            time_seconds: 0.0,
            microseconds_per_quarter_note: 500_000,
            numerator: 4,
            denominator: 4,
            clocks_per_click: 24,
            notes_per_note: 8,
        }
    }

    pub fn time_pulses(&self) -> u64 {
        self.time_pulses
    }

    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    pub fn microseconds_per_quarter_note(&self) -> u32 {
        self.microseconds_per_quarter_note
    }

    pub fn numerator(&self) -> u8 {
        self.numerator
    }

    pub fn denominator(&self) -> u8 {
        self.denominator
    }

    pub fn clocks_per_click(&self) -> u8 {
        self.clocks_per_click
    }

    pub fn notes_per_note(&self) -> u8 {
        self.notes_per_note
    }

    pub fn beats_per_minute(&self) -> f64 {
        60_000_000.0 / self.microseconds_per_quarter_note as f64
    }
}

/// Ordered sequence of tempo anchors for one song. `ppqn` is `None` for SMPTE-divided songs,
/// which this crate does not support for seconds conversion.
#[derive(Clone, Debug)]
pub(crate) struct TempoMap {
    ppqn: Option<u16>,
    anchors: Vec<TempoAnchor>,
}

impl TempoMap {
    /// A fresh map with just the default anchor at pulse 0 (the empty-construction default).
    pub(crate) fn new(ppqn: Option<u16>) -> Self {
        Self {
            ppqn,
            anchors: vec![TempoAnchor::default_at(0)],
        }
    }

    pub(crate) fn anchors(&self) -> &[TempoAnchor] {
        &self.anchors
    }

    /// Fully regenerates the anchor list from the merged event stream of `tracks`, in ascending
    /// pulse order (ties broken by track number, then event number, matching the playback
    /// cursor's own tie-break rule). Returns any recoverable anomalies (e.g. a discarded
    /// zero-tempo event) so the caller can relay them to its log sink in addition to the global
    /// logger's own `warn!` call made here.
    pub(crate) fn rebuild(&mut self, tracks: &[Track]) -> Vec<String> {
        self.anchors.clear();
        self.anchors.push(TempoAnchor::default_at(0));

        if self.ppqn.is_none() {
            return Vec::new();
        }

        let mut merged: Vec<(u64, usize, usize, &crate::event::Event)> = Vec::new();
        for track in tracks {
            for event in track.events() {
                if event.is_tempo_map_event() {
                    merged.push((
                        event.time_pulses(),
                        event.track_number(),
                        event.event_number(),
                        event,
                    ));
                }
            }
        }
        merged.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let mut warnings = Vec::new();
        for (time_pulses, _, _, event) in merged {
            let buf = event.midi_buffer();
            match buf.get(1) {
                Some(0x51) => {
                    if let Some(w) = self.apply_tempo(time_pulses, buf) {
                        warnings.push(w);
                    }
                }
                Some(0x58) => self.apply_time_signature(time_pulses, buf),
                _ => {}
            }
        }

        self.recompute_seconds();
        warnings
    }

    fn anchor_at_mut(&mut self, time_pulses: u64) -> &mut TempoAnchor {
        if self.anchors.last().map(|a| a.time_pulses) != Some(time_pulses) {
            let inherited = *self.anchors.last().expect("anchor list is never empty");
            self.anchors.push(TempoAnchor {
                time_pulses,
                ..inherited
            });
        }
        self.anchors.last_mut().expect("just pushed or already present")
    }

    /// Applies a tempo change, returning a warning message if it was discarded (a zero value is
    /// invalid and the change is dropped, leaving whatever tempo was previously in effect).
    fn apply_tempo(&mut self, time_pulses: u64, buf: &[u8]) -> Option<String> {
        // verbatim storage means the length byte sits between the meta-type and the payload.
        let payload = &buf[buf.len() - 3..];
        let us = ((payload[0] as u32) << 16) | ((payload[1] as u32) << 8) | payload[2] as u32;
        if us == 0 {
            let message = format!(
                "tempo change at pulse {} has microseconds_per_quarter_note == 0; discarding",
                time_pulses
            );
            warn!("{}", message);
            return Some(message);
        }
        self.anchor_at_mut(time_pulses).microseconds_per_quarter_note = us;
        None
    }

    fn apply_time_signature(&mut self, time_pulses: u64, buf: &[u8]) {
        let payload = &buf[buf.len() - 4..];
        let numerator = payload[0];
        let denominator = 1u16.checked_shl(payload[1] as u32).unwrap_or(0) as u8;
        let clocks_per_click = payload[2];
        let notes_per_note = payload[3];
        let anchor = self.anchor_at_mut(time_pulses);
        anchor.numerator = numerator;
        anchor.denominator = denominator;
        anchor.clocks_per_click = clocks_per_click;
        anchor.notes_per_note = notes_per_note;
    }

    fn recompute_seconds(&mut self) {
        for i in 1..self.anchors.len() {
            let (prev_pulses, prev_seconds, prev_us) = {
                let prev = &self.anchors[i - 1];
                (prev.time_pulses, prev.time_seconds, prev.microseconds_per_quarter_note)
            };
            let ppqn = self.ppqn.expect("seconds only computed for PPQN songs") as f64;
            let delta_pulses = (self.anchors[i].time_pulses - prev_pulses) as f64;
            let delta_seconds = delta_pulses * prev_us as f64 / (ppqn * 1_000_000.0);
            self.anchors[i].time_seconds = prev_seconds + delta_seconds;
        }
    }

    pub(crate) fn anchor_for_pulses(&self, pulses: u64) -> &TempoAnchor {
        self.anchors
            .iter()
            .rev()
            .find(|a| a.time_pulses <= pulses)
            .unwrap_or(&self.anchors[0])
    }

    pub(crate) fn anchor_for_seconds(&self, seconds: f64) -> &TempoAnchor {
        self.anchors
            .iter()
            .rev()
            .find(|a| a.time_seconds <= seconds)
            .unwrap_or(&self.anchors[0])
    }

    /// Converts absolute pulses to seconds. Returns `None` for SMPTE-divided songs.
    pub(crate) fn pulses_to_seconds(&self, pulses: u64) -> Option<f64> {
        let ppqn = self.ppqn? as f64;
        let anchor = self.anchor_for_pulses(pulses);
        let delta_pulses = (pulses - anchor.time_pulses) as f64;
        Some(anchor.time_seconds + delta_pulses * anchor.microseconds_per_quarter_note as f64 / (ppqn * 1_000_000.0))
    }

    /// Converts seconds to absolute pulses. Returns `None` for SMPTE-divided songs.
    pub(crate) fn seconds_to_pulses(&self, seconds: f64) -> Option<u64> {
        let ppqn = self.ppqn? as f64;
        let anchor = self.anchor_for_seconds(seconds);
        let delta_seconds = seconds - anchor.time_seconds;
        let delta_pulses = (delta_seconds * ppqn * 1_000_000.0 / anchor.microseconds_per_quarter_note as f64).round();
        Some(anchor.time_pulses + delta_pulses.max(0.0) as u64)
    }

    pub(crate) fn by_number(&self, number: usize) -> Option<&TempoAnchor> {
        number.checked_sub(1).and_then(|i| self.anchors.get(i))
    }

    pub(crate) fn last(&self) -> &TempoAnchor {
        self.anchors.last().expect("anchor list is never empty")
    }
}
