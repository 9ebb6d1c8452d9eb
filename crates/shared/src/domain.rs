use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Default link lengths of the direct-composition arm, in millimeters.
pub const DIRECT_L1_MM: f64 = 90.0;
pub const DIRECT_L2_MM: f64 = 220.0;

/// Default link lengths of the offset arm, in centimeters.
pub const OFFSET_L1_CM: f64 = 9.51;
pub const OFFSET_L2_CM: f64 = 22.31;
/// Constant elbow offset angle of the offset arm, in degrees.
pub const OFFSET_THETA_DEG: f64 = 122.77133;

pub const DEFAULT_Z: f64 = 100.0;

pub const TUNING_MIN: u32 = 500;
pub const TUNING_MAX: u32 = 4000;
pub const TUNING_DEFAULT: u32 = 500;

/// Geometric convention used to map joint angles to the plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Convention {
    /// `x = l1·cos(θ1) + l2·cos(θ1+θ2)`; the joint-2 angle is relative to link 1.
    Direct,
    /// Law-of-cosines form with a constant elbow offset.
    Offset { theta_deg: f64 },
}

impl Convention {
    pub fn name(&self) -> &'static str {
        match self {
            Convention::Direct => "direct",
            Convention::Offset { .. } => "offset",
        }
    }

    /// Whether program records written under this convention carry speed/acceleration.
    pub fn records_tuning(&self) -> bool {
        matches!(self, Convention::Direct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkGeometry {
    l1: f64,
    l2: f64,
    convention: Convention,
}

impl LinkGeometry {
    pub fn new(l1: f64, l2: f64, convention: Convention) -> Result<Self, GeometryError> {
        if !l1.is_finite() || l1 <= 0.0 {
            return Err(GeometryError::NonPositiveLink { link: 1, value: l1 });
        }
        if !l2.is_finite() || l2 <= 0.0 {
            return Err(GeometryError::NonPositiveLink { link: 2, value: l2 });
        }
        if let Convention::Offset { theta_deg } = convention {
            if !theta_deg.is_finite() {
                return Err(GeometryError::InvalidOffset(theta_deg));
            }
        }
        Ok(Self { l1, l2, convention })
    }

    pub fn direct(l1: f64, l2: f64) -> Result<Self, GeometryError> {
        Self::new(l1, l2, Convention::Direct)
    }

    pub fn offset(l1: f64, l2: f64, theta_deg: f64) -> Result<Self, GeometryError> {
        Self::new(l1, l2, Convention::Offset { theta_deg })
    }

    /// The 90 mm / 220 mm arm driven with the direct convention.
    pub fn scara_mm() -> Self {
        Self {
            l1: DIRECT_L1_MM,
            l2: DIRECT_L2_MM,
            convention: Convention::Direct,
        }
    }

    /// The 9.51 cm / 22.31 cm arm driven with the offset convention.
    pub fn scara_offset_cm() -> Self {
        Self {
            l1: OFFSET_L1_CM,
            l2: OFFSET_L2_CM,
            convention: Convention::Offset {
                theta_deg: OFFSET_THETA_DEG,
            },
        }
    }

    pub fn l1(&self) -> f64 {
        self.l1
    }

    pub fn l2(&self) -> f64 {
        self.l2
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Inner and outer radius of the reachable annulus.
    pub fn reach(&self) -> (f64, f64) {
        ((self.l1 - self.l2).abs(), self.l1 + self.l2)
    }
}

/// Joint axes of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    J1,
    J2,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::J1, Axis::J2, Axis::Z];

    pub fn token(&self) -> &'static str {
        match self {
            Axis::J1 => "J1",
            Axis::J2 => "J2",
            Axis::Z => "Z",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    pub fn new(min: f64, max: f64) -> Result<Self, GeometryError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(GeometryError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamps into the range. NaN maps to the lower bound.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub j1: AxisRange,
    pub j2: AxisRange,
    pub z: AxisRange,
}

impl JointLimits {
    pub fn range(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::J1 => self.j1,
            Axis::J2 => self.j2,
            Axis::Z => self.z,
        }
    }
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            j1: AxisRange {
                min: -90.0,
                max: 266.0,
            },
            j2: AxisRange {
                min: -150.0,
                max: 150.0,
            },
            z: AxisRange {
                min: 0.0,
                max: 150.0,
            },
        }
    }
}

/// Joint and Cartesian position of the arm.
///
/// `x` and `y` are derived by forward kinematics everywhere except when the pose was read back
/// from a program record, where they are whatever was stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub angle1: f64,
    pub angle2: f64,
    pub z: f64,
    pub x: f64,
    pub y: f64,
}

impl Pose {
    pub fn joint(&self, axis: Axis) -> f64 {
        match axis {
            Axis::J1 => self.angle1,
            Axis::J2 => self.angle2,
            Axis::Z => self.z,
        }
    }

    /// Snapshot with every field rounded to two decimals.
    pub fn rounded(&self) -> Self {
        Self {
            angle1: round2(self.angle1),
            angle2: round2(self.angle2),
            z: round2(self.z),
            x: round2(self.x),
            y: round2(self.y),
        }
    }

    /// Axes whose joint value differs from `other`.
    pub fn changed_axes(&self, other: &Pose) -> Vec<Axis> {
        Axis::ALL
            .into_iter()
            .filter(|axis| self.joint(*axis) != other.joint(*axis))
            .collect()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Motion tuning parameters sent to the controller and stored with a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuning {
    pub speed: u32,
    pub acceleration: u32,
}

impl Tuning {
    pub fn clamp_value(value: u32) -> u32 {
        value.clamp(TUNING_MIN, TUNING_MAX)
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            speed: TUNING_DEFAULT,
            acceleration: TUNING_DEFAULT,
        }
    }
}

/// Named start positions.
///
/// The two disagree on the Cartesian label of the same joint position: `JointZero` derives it,
/// `RecordedHome` carries the literal values the controller UI was initialised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    JointZero,
    RecordedHome,
}

pub const RECORDED_HOME: Pose = Pose {
    angle1: 0.0,
    angle2: 0.0,
    z: DEFAULT_Z,
    x: 0.0,
    y: 0.0,
};

impl Preset {
    /// Joint targets `(angle1, angle2, z)`.
    pub fn joints(&self) -> (f64, f64, f64) {
        match self {
            Preset::JointZero => (0.0, 0.0, DEFAULT_Z),
            Preset::RecordedHome => (RECORDED_HOME.angle1, RECORDED_HOME.angle2, RECORDED_HOME.z),
        }
    }

    /// The stored pose for presets that carry literal Cartesian values.
    pub fn recorded_pose(&self) -> Option<Pose> {
        match self {
            Preset::JointZero => None,
            Preset::RecordedHome => Some(RECORDED_HOME),
        }
    }
}
