//! # Target script interpreter module
//!
//! This module provides an interpreter for target scripts, which stand in for
//! the strategy layer by issuing telecommands (new target poses, stops) at
//! fixed times.
//!
//! A script is a sequence of `<time_s>: <json tc>;` statements, for example:
//!
//! ```text
//! 0.5: {"type": "MOVE_TO", "payload": {"robot_id": 0, "x_m": 1.0, "y_m": 0.0}};
//! 4.0: {"type": "STOP_ALL"};
//! ```
//!
//! Anything that doesn't match a statement (such as `#` comment lines) is
//! ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::tc::{Tc, TcParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug)]
struct Command {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The Telecommand to run
    tc: Tc
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use
/// `.get_pending_tcs` to acquire a list of telecommands that need executing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    cmds: VecDeque<Command>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid TC at {0} s: {1}")]
    InvalidTc(f64, TcParseError)
}

#[derive(Debug)]
pub enum PendingTcs {
    None,
    Some(Vec<Tc>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_script_str(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {

        let mut tc_queue: VecDeque<Command> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("the statement regex is valid");

        for cap in re.captures_iter(script) {
            // Groups 1 and 3 always participate in a match
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            let tc_str = cap.get(3).map(|m| m.as_str()).unwrap_or_default();

            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // Parse the TC from the payload. The scripts contain JSON only.
            let tc = Tc::from_json(tc_str)
                .map_err(|e| ScriptError::InvalidTc(exec_time_s, e))?;

            tc_queue.push_back(Command {
                exec_time_s,
                tc
            });
        }

        if tc_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        // Statements are executed in time order even if the script isn't
        // written that way. The sort is stable so simultaneous TCs keep
        // their written order.
        tc_queue.make_contiguous()
            .sort_by(|a, b| a.exec_time_s.total_cmp(&b.exec_time_s));

        Ok(ScriptInterpreter {
            script_path: None,
            cmds: tc_queue
        })
    }

    /// Return the TCs whose execution time has been reached at
    /// `current_time_s` (seconds since the start of the script).
    pub fn get_pending_tcs(&mut self, current_time_s: f64) -> PendingTcs {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingTcs::EndOfScript
        }

        let mut tc_vec: Vec<Tc> = vec![];

        // Pop items from the queue while the head's exec time has passed
        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break;
            }

            if let Some(cmd) = self.cmds.pop_front() {
                tc_vec.push(cmd.tc);
            }
        }

        if tc_vec.is_empty() {
            PendingTcs::None
        }
        else {
            PendingTcs::Some(tc_vec)
        }
    }

    /// Get the number of TCs remaining in the script
    pub fn get_num_tcs(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }

    /// Path the script was loaded from, if it was loaded from a file.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SCRIPT: &str = r#"
# Drive robot 1 forward, then stop everyone
2.0: {"type": "STOP_ALL"};
0.5: {"type": "MOVE_BY", "payload": {"robot_id": 1, "x_m": 1.0, "y_m": 0.0}};
0.5: {"type": "STOP", "payload": {"robot_id": 3}};
"#;

    #[test]
    fn test_pending_tcs() {
        let mut si = ScriptInterpreter::from_script_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_tcs(), 3);
        assert_eq!(si.get_duration(), 2.0);

        assert!(matches!(si.get_pending_tcs(0.1), PendingTcs::None));

        match si.get_pending_tcs(0.5) {
            PendingTcs::Some(tcs) => {
                assert_eq!(tcs.len(), 2);
                assert_eq!(tcs[0].robot_id(), Some(1));
                assert_eq!(tcs[1].robot_id(), Some(3));
            },
            p => panic!("Expected two TCs, got {:?}", p)
        }

        match si.get_pending_tcs(10.0) {
            PendingTcs::Some(tcs) => assert_eq!(tcs, vec![Tc::StopAll]),
            p => panic!("Expected STOP_ALL, got {:?}", p)
        }

        assert!(matches!(si.get_pending_tcs(11.0), PendingTcs::EndOfScript));
    }

    #[test]
    fn test_script_errors() {
        assert!(matches!(
            ScriptInterpreter::from_script_str("# nothing to do here\n"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::from_script_str("1.0: {\"type\": \"FLY\"};"),
            Err(ScriptError::InvalidTc(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::new("/no/such/script.txt"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
