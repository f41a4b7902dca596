//! The retained scene graph: arena-backed tree, nodes, and behaviors.

pub mod behavior;
pub mod node;
pub mod tree;
