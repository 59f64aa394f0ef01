/*!
The `Event` value type and the per-track byte decoder (component 2 and part of the data model,
component 3, in the design docs). Decoding classifies the status byte (`status.rs`), handles
running status, and expands metaevents/SysEx/realtime interleaves into fully self-contained
`midi_buffer`s — nothing downstream ever has to re-derive a status byte from context.
!*/

use crate::error::{self, LibResult};
use crate::reader::Reader;
use crate::status::{self, StatusClass, SystemCommon};
use crate::text::Text;
use log::{trace, warn};

/// A single timestamped MIDI message (or meta/SysEx event) belonging to a track.
///
/// `midi_buffer` is always a complete, self-contained message: running status is expanded, and
/// metaevents are stored verbatim including their VLQ length prefix
/// (`[0xFF, type, length_bytes.., payload..]`), per the storage decision recorded in the design
/// docs.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub(crate) midi_buffer: Vec<u8>,
    pub(crate) delta_time_pulses: u32,
    pub(crate) time_pulses: u64,
    pub(crate) time_seconds: f64,
    pub(crate) event_number: usize,
    pub(crate) track_number: usize,
}

impl Event {
    pub(crate) fn new(midi_buffer: Vec<u8>, delta_time_pulses: u32) -> Self {
        Self {
            midi_buffer,
            delta_time_pulses,
            time_pulses: 0,
            time_seconds: 0.0,
            event_number: 0,
            track_number: 0,
        }
    }

    /// Stamps the position fields assigned by a track once an event is attached: absolute pulses,
    /// 1-based track number, and 1-based event number. `time_seconds` is left for the tempo map to
    /// fill in separately since it depends on anchors that may not exist yet.
    pub(crate) fn stamp(&mut self, time_pulses: u64, track_number: usize, event_number: usize) {
        self.time_pulses = time_pulses;
        self.track_number = track_number;
        self.event_number = event_number;
    }

    pub(crate) fn set_delta_time_pulses(&mut self, delta: u32) {
        self.delta_time_pulses = delta;
    }

    pub(crate) fn set_time_seconds(&mut self, time_seconds: f64) {
        self.time_seconds = time_seconds;
    }

    /// `true` for a tempo (`FF 51 03`) or time-signature (`FF 58 04`) metaevent: the two event
    /// kinds that drive the tempo map.
    pub(crate) fn is_tempo_map_event(&self) -> bool {
        matches!(self.midi_buffer.get(0..2), Some([0xFF, 0x51]) | Some([0xFF, 0x58]))
    }

    /// `true` for the mandatory End-Of-Track metaevent (`FF 2F 00`).
    pub fn is_end_of_track(&self) -> bool {
        self.midi_buffer.as_slice() == [0xFF, 0x2F, 0x00]
    }

    /// The raw MIDI message bytes, including the status byte.
    pub fn midi_buffer(&self) -> &[u8] {
        &self.midi_buffer
    }

    /// Ticks since the previous event on this track (or since song start, for the first event).
    pub fn delta_time_pulses(&self) -> u32 {
        self.delta_time_pulses
    }

    /// Absolute, song-relative position in pulses.
    pub fn time_pulses(&self) -> u64 {
        self.time_pulses
    }

    /// Absolute, song-relative position in seconds, derived through the tempo map.
    pub fn time_seconds(&self) -> f64 {
        self.time_seconds
    }

    /// 1-based position of this event within its track.
    pub fn event_number(&self) -> usize {
        self.event_number
    }

    /// 1-based number of the track this event belongs to.
    pub fn track_number(&self) -> usize {
        self.track_number
    }

    fn status(&self) -> Option<u8> {
        self.midi_buffer.first().copied()
    }

    /// `true` for a metaevent (status byte `0xFF`).
    pub fn is_metadata(&self) -> bool {
        self.status() == Some(status::META_EVENT)
    }

    /// `true` for a one-byte system realtime message (`0xF8..=0xFE`).
    pub fn is_system_realtime(&self) -> bool {
        self.status().map(status::is_realtime).unwrap_or(false)
    }

    /// `true` for any system common message, `0xF0..=0xF7` (including SysEx).
    pub fn is_system_common(&self) -> bool {
        matches!(self.status(), Some(0xF0..=0xF7))
    }

    /// `true` for a SysEx message (`0xF0`, or a standalone `0xF7` escape packet).
    pub fn is_sysex(&self) -> bool {
        matches!(self.status(), Some(status::SYSEX_F0) | Some(status::SYSEX_F7))
    }

    /// `true` if `midi_buffer`'s length is consistent with what its status byte implies. A
    /// hand-built event (e.g. from the mutation API) that fails this is a programming error, not
    /// a parse error, which is why this is a plain predicate rather than a `Result`.
    pub fn is_valid(&self) -> bool {
        let status = match self.status() {
            Some(s) if status::is_status_byte(s) => s,
            _ => return false,
        };
        match status::classify(status) {
            Some(StatusClass::ChannelVoice { length }) => self.midi_buffer.len() == length,
            Some(StatusClass::SystemCommon(SystemCommon::TwoByte)) => self.midi_buffer.len() == 2,
            Some(StatusClass::SystemCommon(SystemCommon::ThreeByte)) => {
                self.midi_buffer.len() == 3
            }
            Some(StatusClass::SystemCommon(SystemCommon::OneByte)) => self.midi_buffer.len() == 1,
            Some(StatusClass::SystemCommon(SystemCommon::StandaloneF7)) => {
                self.midi_buffer.len() >= 1
            }
            Some(StatusClass::SystemCommon(SystemCommon::SysexStart)) => {
                self.midi_buffer.len() >= 1
            }
            Some(StatusClass::SystemRealtime) => self.midi_buffer.len() == 1,
            Some(StatusClass::Meta) => {
                self.midi_buffer.len() >= 3
                    && meta_payload_len(&self.midi_buffer)
                        .map(|(len, consumed)| self.midi_buffer.len() == 2 + consumed + len)
                        .unwrap_or(false)
            }
            None => false,
        }
    }

    /// A short human-readable rendering of the event, e.g. `"NoteOn ch=0 note=60 vel=127"` or
    /// `"SetTempo 500000us/qn"`. Returns `None` for an empty or otherwise unparseable buffer.
    pub fn decode_event(&self) -> Option<String> {
        let status = self.status()?;
        if self.is_metadata() {
            return decode_meta(&self.midi_buffer);
        }
        if status::is_realtime(status) {
            return Some(format!("SystemRealtime {:#04x}", status));
        }
        if self.is_sysex() {
            return Some(format!("SysEx ({} bytes)", self.midi_buffer.len()));
        }
        match status::classify(status)? {
            StatusClass::ChannelVoice { .. } => decode_channel_voice(&self.midi_buffer),
            StatusClass::SystemCommon(_) => Some(format!("SystemCommon {:#04x}", status)),
            _ => None,
        }
    }

    /// The decoded text payload of a metaevent text event (`FF 01`..`FF 09`), else `None`.
    pub fn string_from_event(&self) -> Option<String> {
        if !self.is_metadata() {
            return None;
        }
        let meta_type = *self.midi_buffer.get(1)?;
        if !(0x01..=0x09).contains(&meta_type) {
            return None;
        }
        let (len, consumed) = meta_payload_len(&self.midi_buffer)?;
        let payload_start = 2 + consumed;
        let payload = self.midi_buffer.get(payload_start..payload_start + len)?;
        Some(Text::from(payload.to_vec()).to_string())
    }
}

fn decode_channel_voice(buf: &[u8]) -> Option<String> {
    let status = *buf.first()?;
    let channel = status & 0x0F;
    let name = match status & 0xF0 {
        0x80 => "NoteOff",
        0x90 => "NoteOn",
        0xA0 => "PolyPressure",
        0xB0 => "ControlChange",
        0xC0 => "ProgramChange",
        0xD0 => "ChannelPressure",
        0xE0 => "PitchBend",
        _ => return None,
    };
    match buf.len() {
        2 => Some(format!("{} ch={} {:#04x}", name, channel, buf[1])),
        3 if status & 0xF0 == 0xE0 => {
            // corrected pitch-bend decoding: value = (msb << 7) | lsb
            let value = ((buf[2] as u16) << 7) | (buf[1] as u16);
            Some(format!("{} ch={} value={}", name, channel, value))
        }
        3 => Some(format!("{} ch={} {:#04x} {:#04x}", name, channel, buf[1], buf[2])),
        _ => None,
    }
}

fn decode_meta(buf: &[u8]) -> Option<String> {
    let meta_type = *buf.get(1)?;
    match meta_type {
        0x2F => Some("EndOfTrack".to_string()),
        0x51 => {
            let (len, consumed) = meta_payload_len(buf)?;
            if len != 3 {
                return None;
            }
            let payload = buf.get(2 + consumed..2 + consumed + 3)?;
            let us = ((payload[0] as u32) << 16) | ((payload[1] as u32) << 8) | payload[2] as u32;
            Some(format!("SetTempo {}us/qn", us))
        }
        0x58 => {
            let (len, consumed) = meta_payload_len(buf)?;
            if len != 4 {
                return None;
            }
            let p = buf.get(2 + consumed..2 + consumed + 4)?;
            Some(format!(
                "TimeSignature {}/{}",
                p[0],
                1u32 << p[1] as u32
            ))
        }
        0x01..=0x09 => Some(format!("Text[{:#04x}]", meta_type)),
        other => Some(format!("Meta[{:#04x}]", other)),
    }
}

/// Returns `(payload_len, vlq_bytes_consumed)` for a meta-event buffer `[0xFF, type, vlq..]`.
fn meta_payload_len(buf: &[u8]) -> Option<(usize, usize)> {
    let vlq_bytes = buf.get(2..)?;
    crate::vlq::decode(vlq_bytes)
        .ok()
        .map(|(len, consumed)| (len as usize, consumed))
}

/// The outcome of decoding one `<delta-time> <event>` entry from a track's byte stream: the main
/// event plus any system-realtime bytes that were spliced out of the middle of it (in the order
/// encountered). Absolute-time bookkeeping is the loader's job; this just reports what was found.
pub(crate) struct Decoded {
    pub(crate) delta_time_pulses: u32,
    pub(crate) midi_buffer: Vec<u8>,
    pub(crate) realtime_splices: Vec<u8>,
}

/// Decodes one track event, consuming bytes from `reader` and updating `last_status` (the
/// per-track running-status register) as a side effect.
pub(crate) fn decode_one(reader: &mut Reader, last_status: &mut Option<u8>) -> LibResult<Decoded> {
    let delta_time_pulses = reader.read_vlq()?;

    let peeked = reader
        .peek()
        .ok_or_else(|| error::Truncated {
            site: site!(),
            description: "expected a status or data byte".to_string(),
        }
        .build())?;

    let status = if status::is_status_byte(peeked) {
        reader.read_u8()?;
        *last_status = Some(peeked);
        peeked
    } else {
        last_status.ok_or_else(|| error::BadStatus {
            site: site!(),
            byte: peeked,
        }
        .build())?
    };

    let class = status::classify(status).ok_or_else(|| error::UnknownStatus {
        site: site!(),
        byte: status,
    }
    .build())?;

    let mut realtime_splices = Vec::new();
    let midi_buffer = match class {
        StatusClass::Meta => decode_meta_payload(reader, status)?,
        StatusClass::SystemCommon(SystemCommon::SysexStart) => decode_sysex(reader)?,
        StatusClass::SystemCommon(SystemCommon::StandaloneF7) => {
            warn!("standalone 0xF7 encountered outside of a SysEx message");
            vec![status]
        }
        StatusClass::SystemCommon(SystemCommon::OneByte) => vec![status],
        StatusClass::SystemCommon(SystemCommon::TwoByte) => {
            let data = read_data_with_splices(reader, 1, &mut realtime_splices)?;
            let mut buf = vec![status];
            buf.extend(data);
            buf
        }
        StatusClass::SystemCommon(SystemCommon::ThreeByte) => {
            let data = read_data_with_splices(reader, 2, &mut realtime_splices)?;
            let mut buf = vec![status];
            buf.extend(data);
            buf
        }
        StatusClass::SystemRealtime => vec![status],
        StatusClass::ChannelVoice { length } => {
            let data = read_data_with_splices(reader, length - 1, &mut realtime_splices)?;
            let mut buf = vec![status];
            buf.extend(data);
            buf
        }
    };

    trace!(
        "decoded event at delta {}: {:?}",
        delta_time_pulses,
        midi_buffer
    );

    Ok(Decoded {
        delta_time_pulses,
        midi_buffer,
        realtime_splices,
    })
}

/// Reads `n` data bytes, peeling off and recording any system-realtime byte encountered along the
/// way instead of counting it toward `n`.
fn read_data_with_splices(
    reader: &mut Reader,
    n: usize,
    splices: &mut Vec<u8>,
) -> LibResult<Vec<u8>> {
    let mut data = Vec::with_capacity(n);
    while data.len() < n {
        let b = reader.read_u8()?;
        if status::is_realtime(b) {
            splices.push(b);
            continue;
        }
        data.push(b);
    }
    Ok(data)
}

fn decode_meta_payload(reader: &mut Reader, status: u8) -> LibResult<Vec<u8>> {
    debug_assert_eq!(status, crate::status::META_EVENT);
    let meta_type = reader.read_u8()?;

    // capture the length field's raw bytes verbatim (not a re-encoding of its value) so a
    // non-canonical VLQ in the source file round-trips unchanged.
    let window = reader.peek_bytes(5);
    let (length, len_consumed) = crate::vlq::decode(window).map_err(|e| match e {
        crate::vlq::VlqError::TruncatedBuffer => error::Truncated {
            site: site!(),
            description: format!("incomplete meta-event length at offset {}", reader.position()),
        }
        .build(),
        crate::vlq::VlqError::Overflow => error::VlqOverflow {
            site: site!(),
            description: format!(
                "meta-event length at offset {} exceeds 28 bits",
                reader.position()
            ),
        }
        .build(),
    })?;
    let length_bytes = reader.read_bytes(len_consumed)?.to_vec();
    let payload = reader.read_bytes(length as usize)?;

    let mut buf = Vec::with_capacity(2 + length_bytes.len() + payload.len());
    buf.push(status);
    buf.push(meta_type);
    buf.extend_from_slice(&length_bytes);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Reads a SysEx body (after the leading `0xF0` has already been consumed as the status byte)
/// until a status byte terminates it. A `0xF7` terminator is folded into the buffer; any other
/// terminating status byte is left unconsumed (it belongs to the next event) and a warning is
/// logged.
fn decode_sysex(reader: &mut Reader) -> LibResult<Vec<u8>> {
    let mut buf = vec![status::SYSEX_F0];
    loop {
        match reader.peek() {
            None => {
                truncated!("SysEx message ran off the end of the buffer without a terminator")
            }
            Some(b) if status::is_status_byte(b) => {
                if b == status::SYSEX_F7 {
                    reader.read_u8()?;
                    buf.push(b);
                } else {
                    warn!(
                        "SysEx message terminated by {:#04x} instead of 0xF7; leaving it for the \
                         next event",
                        b
                    );
                }
                break;
            }
            Some(b) => {
                reader.read_u8()?;
                buf.push(b);
            }
        }
    }
    Ok(buf)
}
