//! Core state types for the N-body simulation.
//!
//! Defines the particle record shared by every stage of a step:
//! - `Particle` using `NVec3` for kinematics and `NVec4` for color
//!
//! Particles live in one dense `Vec`; an index into it is the particle's
//! identity for the duration of a step (tree leaves store these indices).

use nalgebra::{Vector3, Vector4};
pub type NVec3 = Vector3<f64>;
pub type NVec4 = Vector4<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64, // mass, >= 0
    pub radius: f64, // collision radius, >= 0
    pub color: NVec4, // rgba, may exceed 1 for HDR emission
    pub force: NVec3, // force accumulator, reset every step
}

impl Particle {
    /// Particle at rest with white color and a cleared accumulator
    pub fn new(x: NVec3, v: NVec3, m: f64, radius: f64) -> Self {
        Self {
            x,
            v,
            m,
            radius,
            color: NVec4::new(1.0, 1.0, 1.0, 1.0),
            force: NVec3::zeros(),
        }
    }

    pub fn with_color(mut self, color: NVec4) -> Self {
        self.color = color;
        self
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(NVec3::zeros(), NVec3::zeros(), 1.0, 1.0)
    }
}
