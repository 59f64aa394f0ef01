/*!
The Loader state machine: `Start -> ExpectMThd -> ExpectMTrk(k) -> Done`. Grounded
directly on the teacher's `lib.rs::MidiFile::read_inner` / `file/track.rs::Track::parse` control
flow (`expect_tag`, `read_u32`, per-chunk loop, end-of-track check), generalized to this crate's
raw-buffer event model and explicit absolute-pulses bookkeeping.
!*/

use crate::error::{self, LibResult};
use crate::event::{self, Event};
use crate::reader::Reader;
use crate::track::Track;
use crate::{Format, Smf, Timing};
use log::{debug, trace, warn};

const DIVISION_TYPE_BIT: u16 = 0b1000_0000_0000_0000;

pub(crate) fn load_from_memory(bytes: &[u8]) -> LibResult<Smf> {
    let mut reader = Reader::new(bytes);
    trace!("parsing MThd header chunk");

    reader.expect_tag("MThd")?;
    let chunk_length = reader.read_u32_be()?;
    if chunk_length != 6 {
        malformed_header!(format!(
            "MThd length must be 6, found {}",
            chunk_length
        ));
    }
    let format_word = reader.read_u16_be()?;
    let num_tracks = reader.read_u16_be()?;
    let division_word = reader.read_u16_be()?;

    let format = parse_format(format_word)?;
    let timing = parse_division(division_word)?;
    if num_tracks == 0 {
        malformed_header!("MThd declares zero tracks".to_string());
    }
    if let Timing::Ppqn(0) = timing {
        malformed_header!("ppqn must be greater than zero".to_string());
    }

    let mut tracks = Vec::new();
    while tracks.len() < num_tracks as usize {
        if reader.is_end() {
            warn!(
                "expected {} MTrk chunks but the file ended after {}",
                num_tracks,
                tracks.len()
            );
            break;
        }
        if reader.is_tag("MTrk") {
            let track_number = tracks.len() + 1;
            trace!("parsing MTrk chunk {} of {}", track_number, num_tracks);
            tracks.push(parse_track(&mut reader, track_number)?);
        } else {
            skip_unknown_chunk(&mut reader)?;
        }
    }

    let mut smf = Smf::new_with_header(format, timing, tracks);
    smf.rebuild_tempo_map();
    debug!(
        "loaded {} tracks, format={:?}, timing={:?}",
        smf.tracks_len(),
        format,
        timing
    );
    Ok(smf)
}

fn parse_format(word: u16) -> LibResult<Format> {
    match word {
        0 => Ok(Format::Single),
        1 => Ok(Format::Multi),
        2 => {
            warn!("format 2 (independent sequential patterns) is only partially supported");
            Ok(Format::Sequential)
        }
        other => malformed_header!(format!("unknown format {}", other)),
    }
}

fn parse_division(word: u16) -> LibResult<Timing> {
    if word & DIVISION_TYPE_BIT == 0 {
        Ok(Timing::Ppqn(word))
    } else {
        let high_byte = (word >> 8) as u8;
        let frames_per_second = -(high_byte as i8);
        if frames_per_second <= 0 {
            malformed_header!(format!("invalid SMPTE frame rate byte {:#04x}", high_byte));
        }
        Ok(Timing::Smpte {
            frames_per_second: frames_per_second as u8,
            resolution: (word & 0x00FF) as u8,
        })
    }
}

fn skip_unknown_chunk(reader: &mut Reader) -> LibResult<()> {
    let tag = reader.read_bytes(4)?.to_vec();
    let length = reader.read_u32_be()?;
    warn!(
        "skipping unknown chunk '{}' ({} bytes)",
        String::from_utf8_lossy(&tag),
        length
    );
    reader.read_bytes(length as usize)?;
    Ok(())
}

fn parse_track(reader: &mut Reader, track_number: usize) -> LibResult<Track> {
    reader.expect_tag("MTrk")?;
    let chunk_length = reader.read_u32_be()?;
    let body = reader.read_bytes(chunk_length as usize)?;
    let mut body_reader = Reader::new(body);

    let mut track = Track::new(track_number);
    let mut last_status: Option<u8> = None;
    let mut running_pulses: u64 = 0;

    loop {
        if body_reader.is_end() {
            return error::TruncatedChunk {
                site: site!(),
                description: format!(
                    "track {} ended before an EndOfTrack event",
                    track_number
                ),
            }
            .fail();
        }
        let decoded = event::decode_one(&mut body_reader, &mut last_status)?;
        running_pulses += decoded.delta_time_pulses as u64;

        // the delta read from the stream belongs to whichever event lands at `running_pulses`
        // first; every splice or main event after that one is simultaneous with it (delta 0).
        let mut delta_time_pulses = decoded.delta_time_pulses;
        for realtime_byte in decoded.realtime_splices {
            let mut splice = Event::new(vec![realtime_byte], delta_time_pulses);
            splice.stamp(running_pulses, track_number, 0);
            track.push_event(splice);
            delta_time_pulses = 0;
        }

        let mut main_event = Event::new(decoded.midi_buffer, delta_time_pulses);
        let is_eot = main_event.is_end_of_track();
        main_event.stamp(running_pulses, track_number, 0);
        track.push_event(main_event);

        if is_eot {
            if !body_reader.is_end() {
                return error::TruncatedChunk {
                    site: site!(),
                    description: format!(
                        "track {} has bytes remaining after its EndOfTrack event",
                        track_number
                    ),
                }
                .fail();
            }
            break;
        }
    }

    Ok(track)
}
