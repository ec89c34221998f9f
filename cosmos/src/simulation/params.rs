//! Tree and force-law parameters for the Barnes–Hut solver
//!
//! `BarnesHutParams` holds the values that shape both the tree and the
//! gravity it evaluates:
//! - opening angle `theta` and softening length,
//! - gravitational constant `g`,
//! - leaf capacity used while partitioning

/// Hard cap on tree depth; past it a node becomes a leaf regardless of size
pub const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarnesHutParams {
    pub theta: f64, // opening angle threshold (s / d)
    pub softening: f64, // softening length epsilon, added in quadrature
    pub g: f64, // gravitational constant
    pub max_leaf_size: usize, // max particle indices held by a leaf
}

impl Default for BarnesHutParams {
    fn default() -> Self {
        Self {
            theta: 0.7,
            softening: 0.01,
            g: 1.0,
            max_leaf_size: 8,
        }
    }
}
