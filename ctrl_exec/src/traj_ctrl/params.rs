//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::consign::ConsignKind;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// Translation controller proportional gain
    pub trans_k_p: f64,

    /// Translation controller integral gain
    pub trans_k_i: f64,

    /// Translation controller derivative gain
    pub trans_k_d: f64,

    /// Orientation controller proportional gain
    pub orient_k_p: f64,

    /// Orientation controller integral gain
    pub orient_k_i: f64,

    /// Orientation controller derivative gain
    pub orient_k_d: f64,

    /// Cruise speed of translations, also the limit on the norm of the
    /// translation command.
    ///
    /// Units: meters/second
    pub max_velocity_translation_ms: f64,

    /// Units: meters/second^2
    pub max_acceleration_translation_mss: f64,

    /// Cruise rate of rotations, also the limit on the rotation command.
    ///
    /// Units: radians/second
    pub max_velocity_rotation_rads: f64,

    /// Units: radians/second^2
    pub max_acceleration_rotation_radss: f64,

    /// Integration step used by the curves, both in path parameter and in
    /// seconds.
    pub step_time: f64,

    /// The shape of the speed profiles
    pub consign_kind: ConsignKind,

    /// The pose the curves of a movement are referenced to
    pub frame_mode: FrameMode,

    /// If true the speed of the consign is added to the PID outputs
    pub feed_forward: bool,

    /// If true the curves of each new movement are saved in the session
    /// archive
    pub dump_curves: bool,

    /// Sampling period of the saved curves
    pub dump_period_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The reference the curves of a movement, and so the tracking error, are
/// expressed against.
///
/// Commands always leave the controller in the robot's own frame.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameMode {
    /// The fixed field origin
    Absolute,

    /// The robot's pose when the movement started
    Relative,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            trans_k_p: 3.0,
            trans_k_i: 0.0,
            trans_k_d: 0.0,
            orient_k_p: 3.0,
            orient_k_i: 0.0,
            orient_k_d: 0.0,
            max_velocity_translation_ms: 1.0,
            max_acceleration_translation_mss: 20.0,
            max_velocity_rotation_rads: 6.3,
            max_acceleration_rotation_radss: 60.0,
            step_time: 1e-4,
            consign_kind: ConsignKind::default(),
            frame_mode: FrameMode::default(),
            feed_forward: true,
            dump_curves: false,
            dump_period_s: 0.01,
        }
    }
}

impl Default for FrameMode {
    fn default() -> Self {
        FrameMode::Relative
    }
}
