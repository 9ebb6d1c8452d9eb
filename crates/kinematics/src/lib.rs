//! Forward and inverse kinematics of a two-link planar arm.
//!
//! Two conventions are supported and selected by [`LinkGeometry::convention`]:
//!
//! - [`Convention::Direct`]: the joint-2 angle is measured relative to link 1 and the end point is
//!   the direct composition of both links.
//! - [`Convention::Offset`]: the joint-2 angle carries a constant elbow offset and the end point is
//!   solved through the law of cosines.
//!
//! Angles are in degrees at the API boundary. Lengths are in whatever unit the geometry uses.

use std::f64::consts::PI;

use shared::{
    domain::{Convention, LinkGeometry, Pose},
    error::RobotError,
};
use thiserror::Error;

/// Relative slack allowed on the direct-convention cosine ratio so that points exactly on the
/// workspace boundary survive floating-point overshoot.
pub const REACH_TOLERANCE: f64 = 1e-8;

/// Relative slack on the radius check of the offset convention, a few ulps of the outer reach.
const RADIUS_ULPS: f64 = 4.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSolution {
    pub angle1: f64,
    pub angle2: f64,
}

/// The requested point lies outside the arm workspace.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("point ({x}, {y}) is outside the reachable workspace")]
pub struct Unreachable {
    pub x: f64,
    pub y: f64,
}

impl From<Unreachable> for RobotError {
    fn from(value: Unreachable) -> Self {
        RobotError::Unreachable {
            x: value.x,
            y: value.y,
        }
    }
}

/// Kinematics bound to one arm geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsModel {
    geometry: LinkGeometry,
}

impl KinematicsModel {
    pub fn new(geometry: LinkGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &LinkGeometry {
        &self.geometry
    }

    pub fn forward(&self, angle1: f64, angle2: f64) -> (f64, f64) {
        forward_kinematics(angle1, angle2, &self.geometry)
    }

    pub fn inverse(&self, x: f64, y: f64) -> Result<JointSolution, Unreachable> {
        inverse_kinematics(x, y, &self.geometry)
    }

    /// Builds a pose whose Cartesian fields are derived from the joint angles.
    pub fn pose(&self, angle1: f64, angle2: f64, z: f64) -> Pose {
        let (x, y) = self.forward(angle1, angle2);
        Pose {
            angle1,
            angle2,
            z,
            x,
            y,
        }
    }
}

pub fn forward_kinematics(angle1: f64, angle2: f64, geometry: &LinkGeometry) -> (f64, f64) {
    let (l1, l2) = (geometry.l1(), geometry.l2());
    let theta1 = angle1.to_radians();
    let theta2 = angle2.to_radians();

    match geometry.convention() {
        Convention::Direct => direct_forward(l1, l2, theta1, theta2),
        Convention::Offset { theta_deg } => {
            offset_forward(l1, l2, theta1, theta2, theta_deg.to_radians())
        }
    }
}

pub fn inverse_kinematics(
    x: f64,
    y: f64,
    geometry: &LinkGeometry,
) -> Result<JointSolution, Unreachable> {
    if !x.is_finite() || !y.is_finite() {
        return Err(Unreachable { x, y });
    }

    let (l1, l2) = (geometry.l1(), geometry.l2());
    let (theta1, theta2) = match geometry.convention() {
        Convention::Direct => direct_inverse(l1, l2, x, y),
        Convention::Offset { theta_deg } => offset_inverse(l1, l2, x, y, theta_deg.to_radians()),
    }
    .ok_or(Unreachable { x, y })?;

    Ok(JointSolution {
        angle1: theta1.to_degrees(),
        angle2: theta2.to_degrees(),
    })
}

/// Clamps a cosine-derived ratio into the domain of the inverse trig functions.
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

fn direct_forward(l1: f64, l2: f64, theta1: f64, theta2: f64) -> (f64, f64) {
    let x = l1 * theta1.cos() + l2 * (theta1 + theta2).cos();
    let y = l1 * theta1.sin() + l2 * (theta1 + theta2).sin();
    (x, y)
}

fn direct_inverse(l1: f64, l2: f64, x: f64, y: f64) -> Option<(f64, f64)> {
    let r2 = x * x + y * y;
    let cos_theta2 = (r2 - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
    if cos_theta2.abs() > 1.0 + REACH_TOLERANCE {
        return None;
    }

    let theta2 = clamp_unit(cos_theta2).acos();
    let k1 = l1 + l2 * theta2.cos();
    let k2 = l2 * theta2.sin();
    let theta1 = y.atan2(x) - k2.atan2(k1);
    Some((theta1, theta2))
}

fn offset_forward(l1: f64, l2: f64, theta1: f64, theta2: f64, offset: f64) -> (f64, f64) {
    let phi = -(theta2 + offset - PI);
    let d = phi.cos();
    let r2 = (l1 * l1 + l2 * l2 - 2.0 * l1 * l2 * d).max(0.0);
    let r = r2.sqrt();
    if r == 0.0 {
        return (0.0, 0.0);
    }

    let a = clamp_unit((l1 * l1 + r * r - l2 * l2) / (2.0 * l1 * r));
    let beta = (1.0 - a * a).sqrt().atan2(a);
    let alpha = theta1 + beta;
    (r * alpha.cos(), r * alpha.sin())
}

fn offset_inverse(l1: f64, l2: f64, x: f64, y: f64, offset: f64) -> Option<(f64, f64)> {
    let r = (x * x + y * y).sqrt();
    let inner = (l1 - l2).abs();
    let outer = l1 + l2;
    let slack = RADIUS_ULPS * outer;
    if r < inner - slack || r > outer + slack {
        return None;
    }

    let alpha = y.atan2(x);
    let d = clamp_unit((l1 * l1 + l2 * l2 - r * r) / (2.0 * l1 * l2));
    // With equal links the origin is reachable and any shoulder angle works.
    let a = if r > 0.0 {
        clamp_unit((l1 * l1 + r * r - l2 * l2) / (2.0 * l1 * r))
    } else {
        0.0
    };

    let sin_a = (1.0 - a * a).sqrt();
    let sin_d = (1.0 - d * d).sqrt();

    // The sign of the first-pass shoulder angle picks the elbow branch.
    let mut beta = sin_a.atan2(a);
    let phi = if alpha - beta < 0.0 {
        beta = (-sin_a).atan2(a);
        (-sin_d).atan2(d)
    } else {
        sin_d.atan2(d)
    };

    let theta1 = alpha - beta;
    let theta2 = -(phi + offset - PI);
    Some((theta1, theta2))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
