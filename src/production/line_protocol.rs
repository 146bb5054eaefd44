//! Statsd line protocol
//!
//! ```text
//! <key>:<value>|c[|@<rate>]
//! <key>:<value>|ms
//! ```
//!
//! A datagram may carry several lines separated by `\n`.

use memchr::memchr_iter;

/// One parsed ingestion event
#[derive(Debug, Clone, PartialEq)]
pub enum StatsdEvent {
    Increment {
        key: String,
        delta: f64,
        sample_rate: f64,
    },
    Timing {
        key: String,
        duration: f64,
    },
}

/// Why a line was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    MissingValue,
    MissingType,
    EmptyKey,
    BadNumber(String),
    UnknownType(String),
    BadSampleRate(String),
    NotUtf8,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::MissingValue => write!(f, "missing ':' separator"),
            LineError::MissingType => write!(f, "missing '|' type field"),
            LineError::EmptyKey => write!(f, "empty key"),
            LineError::BadNumber(v) => write!(f, "invalid value {:?}", v),
            LineError::UnknownType(t) => write!(f, "unsupported metric type {:?}", t),
            LineError::BadSampleRate(r) => write!(f, "invalid sample rate {:?}", r),
            LineError::NotUtf8 => write!(f, "line is not valid UTF-8"),
        }
    }
}

impl std::error::Error for LineError {}

/// Parse a single line
pub fn parse_line(line: &str) -> Result<StatsdEvent, LineError> {
    let (key, rest) = line.split_once(':').ok_or(LineError::MissingValue)?;
    if key.is_empty() {
        return Err(LineError::EmptyKey);
    }

    let mut fields = rest.split('|');
    let value = fields.next().unwrap_or_default();
    let kind = fields.next().ok_or(LineError::MissingType)?;
    let value = parse_finite(value.trim())
        .ok_or_else(|| LineError::BadNumber(value.to_string()))?;

    match kind {
        "c" => {
            let sample_rate = match fields.next() {
                Some(rate) => {
                    let raw = rate
                        .strip_prefix('@')
                        .ok_or_else(|| LineError::BadSampleRate(rate.to_string()))?;
                    parse_finite(raw)
                        .ok_or_else(|| LineError::BadSampleRate(rate.to_string()))?
                }
                None => 1.0,
            };
            Ok(StatsdEvent::Increment {
                key: key.to_string(),
                delta: value,
                sample_rate,
            })
        }
        "ms" => Ok(StatsdEvent::Timing {
            key: key.to_string(),
            duration: value,
        }),
        other => Err(LineError::UnknownType(other.to_string())),
    }
}

/// `NaN` and infinities parse as `f64` but graphite cannot ingest them
fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split a datagram into lines and parse each, skipping blank lines
pub fn parse_datagram(buf: &[u8]) -> Vec<Result<StatsdEvent, LineError>> {
    let mut events = Vec::new();
    let mut start = 0;

    let ends = memchr_iter(b'\n', buf).chain(std::iter::once(buf.len()));
    for end in ends {
        let raw = &buf[start..end];
        start = end + 1;

        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            continue;
        }
        events.push(match std::str::from_utf8(raw) {
            Ok(line) => parse_line(line),
            Err(_) => Err(LineError::NotUtf8),
        });
    }

    events
}
