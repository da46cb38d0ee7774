//! # Telecommand module
//!
//! Telecommands are the instructions handed to the trajectory control core by whoever chooses
//! the robots' targets (a script, an operator, or a strategy layer).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A target pose for a single robot.
///
/// Depending on the telecommand this is either an absolute pose in the field frame or an offset
/// from the robot's pose at the time the command is executed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseTarget {
    pub robot_id: u8,
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub theta_rad: f64,
}

/// Payload of the stop telecommand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotId {
    pub robot_id: u8,
}

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static TYPE_HAS_NO_PAYLOAD: [TcType; 1] = [TcType::StopAll];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Move the robot to the given absolute pose.
    MoveTo(PoseTarget),

    /// Move the robot by the given offset from its current pose.
    MoveBy(PoseTarget),

    /// Abandon the current movement and hold the current pose.
    Stop(RobotId),

    /// Disable every robot.
    StopAll,
}

/// Telecommand types, as written in the `type` field of a JSON telecommand.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum TcType {
    MoveTo,
    MoveBy,
    Stop,
    StopAll,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0:?} is expected to have a payload but it doesn't")]
    MissingPayload(TcType),

    #[error("TC of type {0:?} has an invalid payload: {1}")]
    InvalidPayload(TcType, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet of the form
    /// `{"type": "MOVE_TO", "payload": {...}}`.
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value
        let val: Value = serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)?;

        // Get the type of the TC
        let type_str = match val["type"].as_str() {
            Some(s) => s,
            None => {
                return Err(TcParseError::InvalidType(String::from(
                    "Expected \"type\" to be a string",
                )))
            }
        };
        let tc_type = match TcType::from_str(type_str) {
            Some(t) => t,
            None => {
                return Err(TcParseError::InvalidType(format!(
                    "{} is not a recognised TC type",
                    type_str
                )))
            }
        };

        // Get the payload. If it's null and the type should have a payload then an error is
        // returned
        let payload = &val["payload"];
        if payload.is_null() && !TYPE_HAS_NO_PAYLOAD.contains(&tc_type) {
            return Err(TcParseError::MissingPayload(tc_type));
        }

        let invalid = |e| TcParseError::InvalidPayload(tc_type, e);

        Ok(match tc_type {
            TcType::MoveTo => Tc::MoveTo(serde_json::from_value(payload.clone()).map_err(invalid)?),
            TcType::MoveBy => Tc::MoveBy(serde_json::from_value(payload.clone()).map_err(invalid)?),
            TcType::Stop => Tc::Stop(serde_json::from_value(payload.clone()).map_err(invalid)?),
            TcType::StopAll => Tc::StopAll,
        })
    }

    /// The robot this TC is addressed to, or `None` if it targets every robot.
    pub fn robot_id(&self) -> Option<u8> {
        match self {
            Tc::MoveTo(t) | Tc::MoveBy(t) => Some(t.robot_id),
            Tc::Stop(r) => Some(r.robot_id),
            Tc::StopAll => None,
        }
    }
}

impl TcType {
    fn from_str(s: &str) -> Option<Self> {
        match s {
            "MOVE_TO" => Some(TcType::MoveTo),
            "MOVE_BY" => Some(TcType::MoveBy),
            "STOP" => Some(TcType::Stop),
            "STOP_ALL" => Some(TcType::StopAll),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_move_to() {
        let tc = Tc::from_json(
            r#"{"type": "MOVE_TO", "payload": {"robot_id": 2, "x_m": 1.5, "y_m": -0.5, "theta_rad": 0.3}}"#,
        )
        .unwrap();

        assert_eq!(
            tc,
            Tc::MoveTo(PoseTarget {
                robot_id: 2,
                x_m: 1.5,
                y_m: -0.5,
                theta_rad: 0.3
            })
        );
        assert_eq!(tc.robot_id(), Some(2));
    }

    #[test]
    fn test_parse_default_theta() {
        let tc = Tc::from_json(r#"{"type": "MOVE_BY", "payload": {"robot_id": 0, "x_m": 1.0, "y_m": 0.0}}"#)
            .unwrap();

        match tc {
            Tc::MoveBy(t) => assert_eq!(t.theta_rad, 0.0),
            _ => panic!("Expected MoveBy, got {:?}", tc),
        }
    }

    #[test]
    fn test_parse_stop_all_without_payload() {
        let tc = Tc::from_json(r#"{"type": "STOP_ALL"}"#).unwrap();
        assert_eq!(tc, Tc::StopAll);
        assert_eq!(tc.robot_id(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Tc::from_json("{not json"),
            Err(TcParseError::InvalidJson(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "JUMP"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "STOP"}"#),
            Err(TcParseError::MissingPayload(TcType::Stop))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "STOP", "payload": {"id": 1}}"#),
            Err(TcParseError::InvalidPayload(TcType::Stop, _))
        ));
    }
}
