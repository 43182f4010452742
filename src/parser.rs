//! Line splitting and prefix classification for `text/event-stream` bodies

use core::str::Utf8Error;

use bytes::{Buf, Bytes, BytesMut};
use bytes_utils::Str;

use crate::constants::{
    COMMENT, COMMENT_SPACE, CR, DATA, DATA_SPACE, EVENT, EVENT_SPACE, ID, ID_SPACE, LF, RETRY,
};

/// What a line's prefix says it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Id,
    Comment,
    Event,
    Data,
    Retry,
}

/// Full line from an SSE stream with its terminator removed. Note: You probably want to [RawEventLineOwned::validate] these into [ValidatedEventLine]s
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEventLineOwned {
    Empty,
    Field {
        field_name: FieldName,
        field_value: Bytes,
    },
    /// Any line shape the grammar does not recognise, kept whole for error reporting
    Unknown(Bytes),
}

/// Completely parsed SSE event line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedEventLine {
    Empty,
    Field {
        field_name: FieldName,
        field_value: Str,
    },
    Unknown(Bytes),
}

fn validate_bytes(val: Bytes) -> Result<Str, Utf8Error> {
    match str::from_utf8(val.as_ref()) {
        Ok(_) => Ok(unsafe { Str::from_inner_unchecked(val) }),
        Err(e) => Err(e),
    }
}

impl RawEventLineOwned {
    /// Checks the field value is UTF-8. Unknown lines are passed through untouched.
    pub fn validate(self) -> Result<ValidatedEventLine, Utf8Error> {
        match self {
            RawEventLineOwned::Empty => Ok(ValidatedEventLine::Empty),
            RawEventLineOwned::Field {
                field_name,
                field_value,
            } => Ok(ValidatedEventLine::Field {
                field_name,
                field_value: validate_bytes(field_value)?,
            }),
            RawEventLineOwned::Unknown(line) => Ok(ValidatedEventLine::Unknown(line)),
        }
    }
}

/// Finds the next LF. Returns the non-inclusive end of the line (a CR right before the LF is not
/// part of the line) and the inclusive start of the remainder.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let lf = memchr::memchr(LF, bytes)?;
    let line_end = if lf > 0 && bytes[lf - 1] == CR {
        lf - 1
    } else {
        lf
    };
    Some((line_end, lf + 1))
}

const PREFIXES: [(&[u8], FieldName); 9] = [
    (ID_SPACE, FieldName::Id),
    (ID, FieldName::Id),
    (COMMENT_SPACE, FieldName::Comment),
    (COMMENT, FieldName::Comment),
    (EVENT_SPACE, FieldName::Event),
    (EVENT, FieldName::Event),
    (DATA_SPACE, FieldName::Data),
    (DATA, FieldName::Data),
    (RETRY, FieldName::Retry),
];

fn classify(line: Bytes) -> RawEventLineOwned {
    if line.is_empty() {
        return RawEventLineOwned::Empty;
    }

    for (prefix, field_name) in PREFIXES {
        if line.starts_with(prefix) {
            return RawEventLineOwned::Field {
                field_name,
                field_value: line.slice(prefix.len()..),
            };
        }
    }

    RawEventLineOwned::Unknown(line)
}

/// Reads the next [RawEventLineOwned] from the buffer, then advances the buffer past the corresponding EOL.
/// Returns [None] if the buffer holds no LF yet; a trailing CR is only a terminator once its LF arrives.
pub fn parse_line_from_buffer(buffer: &mut BytesMut) -> Option<RawEventLineOwned> {
    let (line_end, rem_start) = find_eol(buffer)?;

    let line = buffer.split_to(line_end).freeze();
    buffer.advance(rem_start - line_end);

    Some(classify(line))
}
