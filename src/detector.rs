//! Decides which solve of a challenge is its first blood. No I/O happens here.

use std::{collections::HashSet, fmt};

use time::{
    error::ConversionRange, format_description::BorrowedFormatItem, macros::format_description,
    Duration, PrimitiveDateTime,
};

use crate::ctfd::{Challenge, Solve};

/// Fixed shift applied to the platform's UTC timestamps before display.
/// Daylight saving is not applied.
pub const SOLVE_TIME_OFFSET: Duration = Duration::hours(1);

/// `2024-01-01T10:00:00.000000Z` (CTFd emits six fractional digits)
const PLATFORM_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]Z");

/// `01/01/2024 11:00:00`
const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]/[month]/[year] [hour]:[minute]:[second]");

/// Everything needed to announce one first blood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstBlood {
    pub challenge_id: u64,
    pub challenge_name: String,
    pub solver: String,
    /// Offset by `SOLVE_TIME_OFFSET` and rendered as `DD/MM/YYYY HH:MM:SS`
    pub solved_at: String,
}

#[derive(Debug)]
pub enum DetectError {
    MissingTimestamp {
        challenge_id: u64,
    },
    InvalidTimestamp {
        challenge_id: u64,
        value: String,
        reason: time::Error,
    },
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::MissingTimestamp { challenge_id } => {
                write!(f, "first solve of challenge {challenge_id} has no date")
            }
            DetectError::InvalidTimestamp {
                challenge_id, value, ..
            } => write!(
                f,
                "first solve of challenge {challenge_id} has an invalid date {value:?}"
            ),
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::MissingTimestamp { .. } => None,
            DetectError::InvalidTimestamp { reason, .. } => Some(reason),
        }
    }
}

pub fn is_announced(challenge: &Challenge, announced: &HashSet<u64>) -> bool {
    announced.contains(&challenge.id)
}

/// Converts a platform timestamp into the announcement's display time
pub fn format_solve_time(raw: &str) -> Result<String, time::Error> {
    let parsed = PrimitiveDateTime::parse(raw, PLATFORM_FORMAT)?;
    let shifted = parsed
        .checked_add(SOLVE_TIME_OFFSET)
        .ok_or(time::Error::ConversionRange(ConversionRange))?;

    Ok(shifted.format(DISPLAY_FORMAT)?)
}

/// Returns the announcement to make for `challenge`, if any.
///
/// `solves` must be in the platform's order. CTFd returns them earliest
/// first and the first element is taken as the first blood without checking
/// the dates: a platform that breaks this ordering gets the wrong team announced.
pub fn detect(
    challenge: &Challenge,
    announced: &HashSet<u64>,
    solves: &[Solve],
) -> Result<Option<FirstBlood>, DetectError> {
    if is_announced(challenge, announced) {
        return Ok(None);
    }

    let Some(first) = solves.first() else {
        return Ok(None);
    };

    let raw = first.date.as_deref().ok_or(DetectError::MissingTimestamp {
        challenge_id: challenge.id,
    })?;

    let solved_at = format_solve_time(raw).map_err(|reason| DetectError::InvalidTimestamp {
        challenge_id: challenge.id,
        value: raw.to_string(),
        reason,
    })?;

    Ok(Some(FirstBlood {
        challenge_id: challenge.id,
        challenge_name: challenge.name.clone(),
        solver: first.solver().to_string(),
        solved_at,
    }))
}
