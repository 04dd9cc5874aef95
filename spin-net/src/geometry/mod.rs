pub mod graph;
pub mod lattice;
pub mod offsets;
pub mod topology;

pub use graph::{Edge, Graph, GraphOptions};
pub use lattice::Lattice;
pub use offsets::{hypercubic, triangular};
pub use topology::{Bond, Direction, Neighbor, Topology};
