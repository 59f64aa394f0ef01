use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// The internal Error type for this library. One variant per failure mode named in the
/// error-handling design: callers that need to branch on failure kind can match on the `Debug`
/// representation, but the common case is just propagating with `?`.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum LibError {
    #[snafu(display("{}: truncated buffer: {}", site, description))]
    Truncated { site: String, description: String },

    #[snafu(display("{}: variable-length quantity overflow: {}", site, description))]
    VlqOverflow { site: String, description: String },

    #[snafu(display("{}: MTrk chunk ended before an EndOfTrack event: {}", site, description))]
    TruncatedChunk { site: String, description: String },

    #[snafu(display("{}: malformed header: {}", site, description))]
    MalformedHeader { site: String, description: String },

    #[snafu(display(
        "{}: byte {:#04x} is not a status byte and no running status is set",
        site,
        byte
    ))]
    BadStatus { site: String, byte: u8 },

    #[snafu(display("{}: status byte {:#04x} cannot be classified", site, byte))]
    UnknownStatus { site: String, byte: u8 },

    #[snafu(display("{}: invalid event: {}", site, description))]
    InvalidEvent { site: String, description: String },

    #[snafu(display("{}: song fails save-time validation: {}", site, description))]
    InvalidSong { site: String, description: String },

    #[snafu(display("{}: seek would pass the end of the song", site))]
    SeekPastEnd { site: String },

    #[snafu(display("{}: the target event was never produced by the cursor", site))]
    EventNotInSong { site: String },

    #[snafu(display("{}: unsupported: {}", site, description))]
    Unsupported { site: String, description: String },

    #[snafu(display("{}: io error: {}", site, source))]
    Io {
        site: String,
        source: std::io::Error,
    },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! truncated {
    ($msg:expr) => {
        return crate::error::Truncated {
            site: site!(),
            description: $msg,
        }
        .fail()
    };
    ($fmt:expr, $($arg:expr),+) => {
        return crate::error::Truncated {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .fail()
    };
}

macro_rules! invalid_song {
    ($msg:expr) => {
        return crate::error::InvalidSong {
            site: site!(),
            description: $msg,
        }
        .fail()
    };
    ($fmt:expr, $($arg:expr),+) => {
        return crate::error::InvalidSong {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .fail()
    };
}

macro_rules! malformed_header {
    ($msg:expr) => {
        return crate::error::MalformedHeader {
            site: site!(),
            description: $msg,
        }
        .fail()
    };
    ($fmt:expr, $($arg:expr),+) => {
        return crate::error::MalformedHeader {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
        .fail()
    };
}
