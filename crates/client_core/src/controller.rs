//! Session state of one arm: the current pose, the taught program, and the playback state machine.

use kinematics::{KinematicsModel, Unreachable};
use shared::{
    domain::{Axis, JointLimits, LinkGeometry, Pose, Preset, Tuning, DEFAULT_Z},
    error::RobotError,
};
use storage::{PositionProgram, ProgramDocument};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Unreachable(#[from] Unreachable),
    #[error("program has no saved positions")]
    EmptyProgram,
}

impl From<ControllerError> for RobotError {
    fn from(value: ControllerError) -> Self {
        match value {
            ControllerError::Unreachable(unreachable) => unreachable.into(),
            ControllerError::EmptyProgram => RobotError::EmptyProgram,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramState {
    #[default]
    Idle,
    Running,
}

/// Snapshot of the program taken when playback starts.
///
/// Edits made to the program while a playback is in flight do not affect the steps still to come.
#[derive(Debug)]
pub struct Playback {
    steps: std::vec::IntoIter<Pose>,
    total: usize,
}

impl Playback {
    pub fn total(&self) -> usize {
        self.total
    }
}

impl Iterator for Playback {
    type Item = Pose;

    fn next(&mut self) -> Option<Self::Item> {
        self.steps.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.steps.size_hint()
    }
}

impl ExactSizeIterator for Playback {}

#[derive(Debug, Clone)]
pub struct RobotController {
    model: KinematicsModel,
    limits: JointLimits,
    current: Pose,
    program: PositionProgram,
    tuning: Tuning,
    state: ProgramState,
}

impl RobotController {
    /// Starts at joint zero with the linear axis at its default height.
    pub fn new(geometry: LinkGeometry, limits: JointLimits) -> Self {
        let model = KinematicsModel::new(geometry);
        let current = model.pose(
            limits.j1.clamp(0.0),
            limits.j2.clamp(0.0),
            limits.z.clamp(DEFAULT_Z),
        );
        Self {
            model,
            limits,
            current,
            program: PositionProgram::new(),
            tuning: Tuning::default(),
            state: ProgramState::Idle,
        }
    }

    pub fn with_document(mut self, document: ProgramDocument) -> Self {
        self.load_document(document);
        self
    }

    /// Replaces the program and tuning with the given document.
    pub fn load_document(&mut self, document: ProgramDocument) {
        self.program = document.program;
        self.tuning = Tuning {
            speed: Tuning::clamp_value(document.tuning.speed),
            acceleration: Tuning::clamp_value(document.tuning.acceleration),
        };
    }

    pub fn document(&self) -> ProgramDocument {
        ProgramDocument {
            program: self.program.clone(),
            tuning: self.tuning,
        }
    }

    /// Whether the saved record for this arm carries tuning values.
    pub fn records_tuning(&self) -> bool {
        self.model.geometry().convention().records_tuning()
    }

    pub fn current(&self) -> Pose {
        self.current
    }

    pub fn geometry(&self) -> &LinkGeometry {
        self.model.geometry()
    }

    pub fn model(&self) -> &KinematicsModel {
        &self.model
    }

    pub fn program(&self) -> &PositionProgram {
        &self.program
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn apply_joint_pose(&mut self, angle1: f64, angle2: f64, z: f64) -> Pose {
        self.current = self.model.pose(
            self.limits.j1.clamp(angle1),
            self.limits.j2.clamp(angle2),
            self.limits.z.clamp(z),
        );
        self.current
    }

    /// Solves for `(x, y)` and moves there. An unreachable target leaves the pose untouched.
    pub fn apply_cartesian_target(&mut self, x: f64, y: f64, z: f64) -> Result<Pose, ControllerError> {
        let z = self.limits.z.clamp(z);
        let solution = self.model.inverse(x, y)?;
        // Solutions outside the joint ranges are clamped, not re-checked for reachability.
        Ok(self.apply_joint_pose(solution.angle1, solution.angle2, z))
    }

    pub fn set_axis(&mut self, axis: Axis, value: f64) -> Pose {
        let Pose {
            angle1, angle2, z, ..
        } = self.current;
        match axis {
            Axis::J1 => self.apply_joint_pose(value, angle2, z),
            Axis::J2 => self.apply_joint_pose(angle1, value, z),
            Axis::Z => self.apply_joint_pose(angle1, angle2, value),
        }
    }

    pub fn jog(&mut self, axis: Axis, delta: f64) -> Pose {
        let target = self.current.joint(axis) + delta;
        self.set_axis(axis, target)
    }

    pub fn apply_preset(&mut self, preset: Preset) -> Pose {
        let (angle1, angle2, z) = preset.joints();
        self.apply_joint_pose(angle1, angle2, z)
    }

    /// Records the current pose and returns its index in the program.
    pub fn teach_save(&mut self) -> usize {
        let index = self.program.save(&self.current);
        debug!(index, "taught position");
        index
    }

    pub fn delete_position(&mut self, index: usize) -> Option<Pose> {
        self.program.delete(index)
    }

    pub fn clear_program(&mut self) {
        self.program.clear();
    }

    pub fn set_speed(&mut self, value: u32) -> u32 {
        self.tuning.speed = Tuning::clamp_value(value);
        self.tuning.speed
    }

    pub fn set_acceleration(&mut self, value: u32) -> u32 {
        self.tuning.acceleration = Tuning::clamp_value(value);
        self.tuning.acceleration
    }

    /// Enters `Running` and hands out the stored poses in order.
    ///
    /// Each pose is meant to be passed to [`RobotController::apply_joint_pose`] before the next one
    /// is taken. Stopping early is done by dropping the iterator and calling
    /// [`RobotController::finish_playback`].
    pub fn begin_playback(&mut self) -> Result<Playback, ControllerError> {
        if self.program.is_empty() {
            return Err(ControllerError::EmptyProgram);
        }

        let steps = self.program.positions().to_vec();
        self.state = ProgramState::Running;
        Ok(Playback {
            total: steps.len(),
            steps: steps.into_iter(),
        })
    }

    pub fn finish_playback(&mut self) {
        self.state = ProgramState::Idle;
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
