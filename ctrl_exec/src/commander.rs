//! # Commander module
//!
//! Commanders hand the robot commands over to whatever drives the robots.
//! Commands are queued with `set` and released together by `flush`, there is
//! no acknowledgement.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use std::sync::mpsc::Sender;

// Internal
use comms_if::eqpt::robot::{RobotCmd, MAX_NUM_ROBOTS};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

pub trait Commander {
    /// Queue a command, replacing any command already queued for the same
    /// robot.
    fn set(&mut self, cmd: RobotCmd);

    /// Send all the queued commands.
    fn flush(&mut self);

    /// Disable every robot immediately.
    fn stop_all(&mut self) {
        for robot_id in 0..MAX_NUM_ROBOTS {
            self.set(RobotCmd::disabled(robot_id));
        }
        self.flush();
    }
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A commander which only logs the batches.
#[derive(Debug, Default)]
pub struct LogCommander {
    batch: Batch,

    /// Number of batches flushed so far
    pub num_batches: u64,
}

/// A commander sending batches to the simulator.
#[derive(Debug)]
pub struct SimCommander {
    batch: Batch,
    sender: Sender<Vec<RobotCmd>>,
}

/// Commands waiting to be flushed, at most one per robot.
#[derive(Debug, Default)]
struct Batch {
    cmds: Vec<RobotCmd>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Batch {
    fn set(&mut self, cmd: RobotCmd) {
        match self.cmds.iter_mut().find(|c| c.robot_id == cmd.robot_id) {
            Some(c) => *c = cmd,
            None => self.cmds.push(cmd),
        }
    }

    fn take(&mut self) -> Vec<RobotCmd> {
        std::mem::take(&mut self.cmds)
    }
}

impl Commander for LogCommander {
    fn set(&mut self, cmd: RobotCmd) {
        self.batch.set(cmd);
    }

    fn flush(&mut self) {
        for cmd in self.batch.take() {
            debug!(
                "Robot {}: enabled = {}, vx = {:.3} m/s, vy = {:.3} m/s, w = {:.3} rad/s",
                cmd.robot_id, cmd.enabled, cmd.x_speed_ms, cmd.y_speed_ms, cmd.theta_speed_rads
            );
        }
        self.num_batches += 1;
    }
}

impl SimCommander {
    pub fn new(sender: Sender<Vec<RobotCmd>>) -> Self {
        Self {
            batch: Batch::default(),
            sender,
        }
    }
}

impl Commander for SimCommander {
    fn set(&mut self, cmd: RobotCmd) {
        self.batch.set(cmd);
    }

    fn flush(&mut self) {
        let cmds = self.batch.take();
        if cmds.is_empty() {
            return;
        }

        if let Err(e) = self.sender.send(cmds) {
            warn!("Could not send commands to the simulator: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_batching() {
        let (tx, rx) = channel();
        let mut commander = SimCommander::new(tx);

        commander.set(RobotCmd::new(0, 1.0, 0.0, 0.0));
        commander.set(RobotCmd::new(1, 0.0, 1.0, 0.0));
        commander.set(RobotCmd::new(0, 2.0, 0.0, 0.0));

        // Nothing leaves before the flush
        assert!(rx.try_recv().is_err());

        commander.flush();
        assert_eq!(
            rx.try_recv().unwrap(),
            vec![RobotCmd::new(0, 2.0, 0.0, 0.0), RobotCmd::new(1, 0.0, 1.0, 0.0)]
        );

        // Empty batches aren't sent
        commander.flush();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_all() {
        let (tx, rx) = channel();
        let mut commander = SimCommander::new(tx);

        commander.set(RobotCmd::new(3, 1.0, 0.0, 0.0));
        commander.stop_all();

        let cmds = rx.try_recv().unwrap();
        assert_eq!(cmds.len(), MAX_NUM_ROBOTS as usize);
        assert!(cmds.iter().all(|c| !c.enabled && c.x_speed_ms == 0.0));

        let mut log = LogCommander::default();
        log.stop_all();
        assert_eq!(log.num_batches, 1);
    }
}
