//! Request/response contract of the scoring endpoint.
//!
//! Bodies are validated before anything is scored: a malformed body or a
//! negative / non-finite required number is a client error and the score
//! function never runs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::score::{compute_score, Difficulty, ScoreInput, ScoreOutput, ScoringMode};

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Invalid JSON")]
    InvalidJson,

    /// Carries the offending field for logs; the response body stays generic.
    #[error("Invalid payload")]
    InvalidPayload(&'static str),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        STATUS_BAD_REQUEST
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

/// A status code plus a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

/// Loose numeric coercion: numbers pass, numeric strings parse, `null`,
/// `false` and blank strings are 0, `true` is 1, anything else is NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric_str(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [Value::Null] => 0.0,
            [Value::Number(_) | Value::String(_) | Value::Array(_)] => coerce_number(&items[0]),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix).map_or(f64::NAN, |v| v as f64);
    }

    match s.trim_start_matches(['+', '-']) {
        "Infinity" => {
            if s.starts_with('-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        }
        // f64::from_str also takes "inf" and "NaN", which are not numbers here
        rest if rest.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) => {
            s.parse().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

fn required_number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, ApiError> {
    let value = obj.get(field).map_or(f64::NAN, coerce_number);

    if !value.is_finite() || value < 0.0 {
        return Err(ApiError::InvalidPayload(field));
    }
    Ok(value)
}

/// Absent or `null` means unset; otherwise any finite coercion is kept.
fn optional_number(obj: &Map<String, Value>, field: &str) -> Option<f64> {
    obj.get(field)
        .filter(|v| !v.is_null())
        .map(coerce_number)
        .filter(|v| v.is_finite())
}

fn optional_enum<T: DeserializeOwned>(obj: &Map<String, Value>, field: &str) -> Option<T> {
    obj.get(field)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Validate a request body into a `ScoreInput`, filling service defaults.
pub fn parse_score_request(body: &str) -> Result<ScoreInput, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|_| ApiError::InvalidJson)?;
    let obj = value
        .as_object()
        .ok_or(ApiError::InvalidPayload("body"))?;

    let correct_characters = required_number(obj, "correctCharacters")?;
    let total_typed_characters = required_number(obj, "totalTypedCharacters")?;
    let time_ms = required_number(obj, "timeMs")?;

    let difficulty: Difficulty = optional_enum(obj, "difficulty").unwrap_or_default();
    let scoring_mode: ScoringMode = optional_enum(obj, "scoringMode").unwrap_or_default();
    let target_chars = optional_number(obj, "targetChars").unwrap_or(correct_characters);
    let consistency = optional_number(obj, "consistency");

    Ok(ScoreInput::new(correct_characters, total_typed_characters, time_ms)
        .with_difficulty(difficulty)
        .with_target_chars(target_chars)
        .with_consistency(consistency)
        .with_scoring_mode(scoring_mode))
}

pub fn handle_score_request(body: &str) -> Response {
    match parse_score_request(body) {
        Ok(input) => {
            let output = compute_score(&input);
            Response {
                status: STATUS_OK,
                body: serde_json::to_string(&output).unwrap_or_default(),
            }
        }
        Err(err) => Response {
            status: err.status(),
            body: serde_json::to_string(&ErrorBody {
                error: err.to_string(),
            })
            .unwrap_or_default(),
        },
    }
}

pub fn encode_request(input: &ScoreInput) -> String {
    serde_json::to_string(input).unwrap_or_default()
}

pub fn decode_response(body: &str) -> Result<ScoreOutput, serde_json::Error> {
    serde_json::from_str(body)
}
