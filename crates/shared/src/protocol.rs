//! Line vocabulary spoken with the motion controller.
//!
//! Each message is one UTF-8 line terminated by `\n`. Axis and tuning values use the
//! `<TOKEN>:<value>` form; program control uses bare tokens.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Axis, Pose};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LinkMessage {
    Joint {
        axis: Axis,
        value: f64,
    },
    Speed(u32),
    Accel(u32),
    RunProgram,
    ClearProgram,
    SaveProgram {
        count: usize,
    },
    /// Teach feedback; `number` is the 1-based position number.
    PositionSaved {
        number: usize,
        angle1: f64,
        angle2: f64,
        z: f64,
    },
    /// Controller-side request to record the current pose.
    SavePos,
    /// Controller-side request to play the program back.
    RunProg,
    /// Controller-side request to clear the program.
    ClearProg,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("unknown token '{0}'")]
    UnknownToken(String),
    #[error("invalid value '{value}' for {token}")]
    InvalidValue { token: String, value: String },
    #[error("missing field {field} in {token}")]
    MissingField { token: String, field: &'static str },
}

impl LinkMessage {
    pub fn joint(axis: Axis, value: f64) -> Self {
        LinkMessage::Joint { axis, value }
    }

    pub fn position_saved(index: usize, pose: &Pose) -> Self {
        LinkMessage::PositionSaved {
            number: index + 1,
            angle1: pose.angle1,
            angle2: pose.angle2,
            z: pose.z,
        }
    }

    /// Encoded form including the trailing newline.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for LinkMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMessage::Joint { axis, value } => write!(f, "{}:{value:.2}", axis.token()),
            LinkMessage::Speed(value) => write!(f, "SPEED:{value}"),
            LinkMessage::Accel(value) => write!(f, "ACCEL:{value}"),
            LinkMessage::RunProgram => f.write_str("RUN_PROGRAM"),
            LinkMessage::ClearProgram => f.write_str("CLEAR_PROGRAM"),
            LinkMessage::SaveProgram { count } => write!(f, "SAVE_PROGRAM:{count}"),
            LinkMessage::PositionSaved {
                number,
                angle1,
                angle2,
                z,
            } => write!(f, "POS_SAVED:{number},J1={angle1:.2},J2={angle2:.2},Z={z:.2}"),
            LinkMessage::SavePos => f.write_str("SAVE_POS"),
            LinkMessage::RunProg => f.write_str("RUN_PROG"),
            LinkMessage::ClearProg => f.write_str("CLEAR_PROG"),
        }
    }
}

impl FromStr for LinkMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        match line {
            "RUN_PROGRAM" => return Ok(LinkMessage::RunProgram),
            "CLEAR_PROGRAM" => return Ok(LinkMessage::ClearProgram),
            "SAVE_POS" => return Ok(LinkMessage::SavePos),
            "RUN_PROG" => return Ok(LinkMessage::RunProg),
            "CLEAR_PROG" => return Ok(LinkMessage::ClearProg),
            _ => {}
        }

        let Some((token, value)) = line.split_once(':') else {
            return Err(ProtocolError::UnknownToken(line.to_string()));
        };
        let value = value.trim();

        match token.trim() {
            "J1" => Ok(LinkMessage::joint(Axis::J1, parse_real(token, value)?)),
            "J2" => Ok(LinkMessage::joint(Axis::J2, parse_real(token, value)?)),
            "Z" => Ok(LinkMessage::joint(Axis::Z, parse_real(token, value)?)),
            "SPEED" => Ok(LinkMessage::Speed(parse_tuning(token, value)?)),
            "ACCEL" => Ok(LinkMessage::Accel(parse_tuning(token, value)?)),
            "SAVE_PROGRAM" => Ok(LinkMessage::SaveProgram {
                count: parse_count(token, value)?,
            }),
            "POS_SAVED" => parse_position_saved(value),
            other => Err(ProtocolError::UnknownToken(other.to_string())),
        }
    }
}

fn invalid(token: &str, value: &str) -> ProtocolError {
    ProtocolError::InvalidValue {
        token: token.to_string(),
        value: value.to_string(),
    }
}

fn parse_real(token: &str, value: &str) -> Result<f64, ProtocolError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| invalid(token, value))
}

fn parse_tuning(token: &str, value: &str) -> Result<u32, ProtocolError> {
    let parsed = parse_real(token, value)?.round();
    if parsed < 0.0 || parsed > f64::from(u32::MAX) {
        return Err(invalid(token, value));
    }
    Ok(parsed as u32)
}

fn parse_count(token: &str, value: &str) -> Result<usize, ProtocolError> {
    value.parse::<usize>().map_err(|_| invalid(token, value))
}

fn parse_position_saved(value: &str) -> Result<LinkMessage, ProtocolError> {
    const TOKEN: &str = "POS_SAVED";
    let missing = |field| ProtocolError::MissingField {
        token: TOKEN.to_string(),
        field,
    };

    let mut parts = value.split(',').map(str::trim);
    let number = parts
        .next()
        .filter(|part| !part.is_empty())
        .ok_or_else(|| missing("number"))
        .and_then(|part| parse_count(TOKEN, part))?;

    let (mut angle1, mut angle2, mut z) = (None, None, None);
    for part in parts {
        let Some((key, raw)) = part.split_once('=') else {
            return Err(invalid(TOKEN, part));
        };
        let parsed = parse_real(TOKEN, raw.trim())?;
        match key.trim() {
            "J1" => angle1 = Some(parsed),
            "J2" => angle2 = Some(parsed),
            "Z" => z = Some(parsed),
            _ => return Err(invalid(TOKEN, part)),
        }
    }

    Ok(LinkMessage::PositionSaved {
        number,
        angle1: angle1.ok_or_else(|| missing("J1"))?,
        angle2: angle2.ok_or_else(|| missing("J2"))?,
        z: z.ok_or_else(|| missing("Z"))?,
    })
}
