//! # Kinematic simulator
//!
//! A stand-in for the field: holonomic robots which apply their last velocity
//! command, expressed in their own frame, perfectly, and a vision system which sees every robot on every
//! step. Used by the `--simulation` mode of the executable and the end to end
//! tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use std::sync::mpsc::{channel, Receiver, Sender};

// Internal
use crate::loc::Pose;
use comms_if::eqpt::robot::RobotCmd;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct Simulator {
    robots: Vec<SimRobot>,

    /// Longest integration step, longer updates are split
    max_step_s: f64,

    /// Time of the last update
    time_s: Option<f64>,

    receiver: Receiver<Vec<RobotCmd>>,
}

#[derive(Debug, Clone)]
struct SimRobot {
    pose: Pose,
    cmd: RobotCmd,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Simulator {
    /// Create a new simulator with robots at the given poses, robot `i` being
    /// at `poses[i]`.
    ///
    /// Returns the simulator and the sender commands should be sent through.
    pub fn new(poses: &[Pose], max_step_s: f64) -> (Self, Sender<Vec<RobotCmd>>) {
        let (tx, rx) = channel();

        let robots = poses
            .iter()
            .enumerate()
            .map(|(i, p)| SimRobot {
                pose: *p,
                cmd: RobotCmd::disabled(i as u8),
            })
            .collect();

        (
            Self {
                robots,
                max_step_s,
                time_s: None,
                receiver: rx,
            },
            tx,
        )
    }

    pub fn num_robots(&self) -> usize {
        self.robots.len()
    }

    /// Poses of all the robots, indexed by robot id.
    pub fn poses(&self) -> impl Iterator<Item = (u8, Pose)> + '_ {
        self.robots
            .iter()
            .enumerate()
            .map(|(i, r)| (i as u8, r.pose))
    }

    /// Advance the simulation to `time_s`.
    ///
    /// The robots move according to the commands in force since the last
    /// update, then the commands received in the meantime are applied.
    pub fn step(&mut self, time_s: f64) {
        let dt = match self.time_s {
            Some(t) if time_s > t => time_s - t,
            _ => 0.0,
        };
        self.time_s = Some(time_s);

        if dt > 0.0 {
            let num_steps = if self.max_step_s > 0.0 {
                (dt / self.max_step_s).ceil().max(1.0) as usize
            } else {
                1
            };
            let h = dt / num_steps as f64;

            for robot in self.robots.iter_mut() {
                for _ in 0..num_steps {
                    robot.integrate(h);
                }
            }
        }

        while let Ok(cmds) = self.receiver.try_recv() {
            for cmd in cmds {
                match self.robots.get_mut(cmd.robot_id as usize) {
                    Some(r) => r.cmd = cmd,
                    None => trace!("Command for robot {} which isn't simulated", cmd.robot_id),
                }
            }
        }
    }
}

impl SimRobot {
    fn integrate(&mut self, dt: f64) {
        if !self.cmd.enabled {
            return;
        }

        let w = self.cmd.theta_speed_rads;
        let vel = Vector2::new(self.cmd.x_speed_ms, self.cmd.y_speed_ms);

        // The robot turns during the step, take the mid-step heading
        let mid = Pose {
            orientation_rad: self.pose.orientation_rad + 0.5 * w * dt,
            ..self.pose
        };
        let vel_field = mid.to_field_frame(&vel);

        self.pose.position_m += vel_field * dt;
        self.pose.orientation_rad = wrap_pi(self.pose.orientation_rad + w * dt);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_robot_frame_commands() {
        let (mut sim, tx) = Simulator::new(
            &[Pose::new(0.0, 0.0, FRAC_PI_2), Pose::new(1.0, 1.0, 0.0)],
            0.001,
        );

        sim.step(0.0);
        tx.send(vec![RobotCmd::new(0, 1.0, 0.0, 0.0), RobotCmd::new(7, 1.0, 0.0, 0.0)])
            .unwrap();
        sim.step(0.0);
        sim.step(0.5);

        let poses: Vec<_> = sim.poses().collect();

        // Forward for robot 0 is the field's +ve Y
        assert_abs_diff_eq!(poses[0].1.position_m, Vector2::new(0.0, 0.5), epsilon = 1e-9);

        // Robot 1 never got a command
        assert_eq!(poses[1].1, Pose::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_rotation_and_disable() {
        let (mut sim, tx) = Simulator::new(&[Pose::new(0.0, 0.0, FRAC_PI_2)], 0.01);

        // Sideways to the left while turning, the robot's left starts as the
        // field's -ve X
        tx.send(vec![RobotCmd::new(0, 0.0, 1.0, 1.0)]).unwrap();
        sim.step(0.0);
        sim.step(0.5);

        // Exact solution of the unicycle integration with a constant turn rate
        let pose = sim.poses().next().unwrap().1;
        let expected = Vector2::new(
            (FRAC_PI_2 + 0.5).cos() - FRAC_PI_2.cos(),
            (FRAC_PI_2 + 0.5).sin() - FRAC_PI_2.sin(),
        );
        assert_abs_diff_eq!(pose.position_m, expected, epsilon = 1e-5);
        assert_abs_diff_eq!(pose.orientation_rad, FRAC_PI_2 + 0.5, epsilon = 1e-9);

        // Disabling stops the robot
        tx.send(vec![RobotCmd::disabled(0)]).unwrap();
        sim.step(0.5);
        sim.step(1.0);
        assert_eq!(sim.poses().next().unwrap().1, pose);
    }
}
