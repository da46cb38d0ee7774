//! # Data Store

use comms_if::tc::Tc;

use crate::{loc::VisionTable, traj_ctrl::{Control, StatusReport}};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Data shared by the tasks of the control loop.
#[derive(Debug, Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already started
    pub num_cycles: u64,

    /// Time of the current cycle, in seconds since the start of the loop
    pub time_s: f64,

    // Localisation
    pub vision: VisionTable,

    /// Telecommands received this cycle and not yet executed
    pub tcs: Vec<Tc>,

    // TrajCtrl
    /// Controls computed this cycle, with the robot they are for
    pub controls: Vec<(u8, Control)>,

    pub traj_ctrl_reports: Vec<(u8, StatusReport)>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Clears the outputs of the previous cycle and sets the cycle time.
    pub fn cycle_start(&mut self, time_s: f64) {
        self.time_s = time_s;
        self.num_cycles += 1;

        self.controls.clear();
        self.traj_ctrl_reports.clear();
    }
}
