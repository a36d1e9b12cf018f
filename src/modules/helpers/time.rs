use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?(?:(\d{1,3}):)?(?:(\d{1,2}):)?(\d{1,4})(?:[.,](\d{1,3}))?$")
        .expect("valid time regex")
});

/// How a driver's session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionStatus {
    Finished,
    Dns,
    Dnf,
    Dsq,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Finished => "finished",
            CompletionStatus::Dns => "dns",
            CompletionStatus::Dnf => "dnf",
            CompletionStatus::Dsq => "dsq",
        }
    }

    pub fn is_finished(&self) -> bool {
        *self == CompletionStatus::Finished
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompletionStatus {
    type Err = ParseTimeError;

    /// accepts the stored names as well as the keywords operators type in
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "finished" => Ok(CompletionStatus::Finished),
            "dns" | "assente" | "absent" | "/" => Ok(CompletionStatus::Dns),
            "dnf" | "rit" | "ritirato" | "retired" => Ok(CompletionStatus::Dnf),
            "dsq" | "squalificato" | "disqualified" => Ok(CompletionStatus::Dsq),
            _ => Err(ParseTimeError {
                token: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeError {
    pub token: String,
}

impl fmt::Display for ParseTimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unrecognized time token: {:?}", self.token)
    }
}

impl std::error::Error for ParseTimeError {}

/// A parsed time token: milliseconds for finishers, None for everybody else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedTime {
    pub millis: Option<i32>,
    pub status: CompletionStatus,
}

impl ParsedTime {
    pub fn finished(millis: i32) -> ParsedTime {
        ParsedTime {
            millis: Some(millis),
            status: CompletionStatus::Finished,
        }
    }

    pub fn not_finished(status: CompletionStatus) -> ParsedTime {
        ParsedTime {
            millis: None,
            status,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished() && self.millis.is_some()
    }
}

impl FromStr for ParsedTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();

        if let Ok(status) = token.parse::<CompletionStatus>() {
            if status != CompletionStatus::Finished {
                return Ok(ParsedTime::not_finished(status));
            }
        }

        let captures = TIME_RE.captures(token).ok_or_else(|| ParseTimeError {
            token: token.to_string(),
        })?;

        let number = |index: usize| -> i64 {
            captures
                .get(index)
                .and_then(|m| m.as_str().parse::<i64>().ok())
                .unwrap_or(0)
        };

        // a single leading group is minutes, two leading groups are hours and minutes
        let (hours, minutes) = match (captures.get(1), captures.get(2)) {
            (Some(_), Some(_)) => (number(1), number(2)),
            (Some(_), None) => (0, number(1)),
            _ => (0, 0),
        };
        let seconds = number(3);

        if (captures.get(1).is_some() && seconds >= 60) || (captures.get(2).is_some() && minutes >= 60) {
            return Err(ParseTimeError {
                token: token.to_string(),
            });
        }

        // ".4" is 400ms, ".45" is 450ms
        let millis = match captures.get(4) {
            Some(fraction) => {
                let digits = fraction.as_str();
                let value = digits.parse::<i64>().unwrap_or(0);
                value * 10_i64.pow(3 - digits.len() as u32)
            }
            None => 0,
        };

        let total = ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis;
        i32::try_from(total)
            .map(ParsedTime::finished)
            .map_err(|_| ParseTimeError {
                token: token.to_string(),
            })
    }
}

/// # parse a time token
/// parse a lap/race time or a status keyword. tokens that can't be read are
/// treated as a DNF so a single bad token does not reject the whole batch
///
/// ## Arguments
/// * `token` - the raw token, e.g. `1:23.456`, `83,4`, `dns`
///
/// ## Returns
/// * `ParsedTime` - the milliseconds (finishers only) and the completion status
pub fn parse_time(token: &str) -> ParsedTime {
    match token.parse::<ParsedTime>() {
        Ok(parsed) => parsed,
        Err(err) => {
            log::debug!(target:"helpers/time:parse_time", "{}, defaulting to dnf", err);
            ParsedTime::not_finished(CompletionStatus::Dnf)
        }
    }
}

/// # format milliseconds
/// render milliseconds the way operators write them: `ss.SSS`, `m:ss.SSS` or `h:mm:ss.SSS`
pub fn format_millis(millis: i32) -> String {
    let (seconds, milliseconds) = (millis / 1000, millis % 1000);
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    } else if minutes > 0 {
        format!("{}:{:02}.{:03}", minutes, seconds, milliseconds)
    } else {
        format!("{}.{:03}", seconds, milliseconds)
    }
}

/// # format a parsed time
/// inverse of `parse_time`: finishers become a time, everybody else their status keyword
pub fn format_time(parsed: &ParsedTime) -> String {
    match (parsed.status, parsed.millis) {
        (CompletionStatus::Finished, Some(millis)) => format_millis(millis),
        (CompletionStatus::Finished, None) => CompletionStatus::Dnf.as_str().to_uppercase(),
        (status, _) => status.as_str().to_uppercase(),
    }
}
