use super::{Graph, Lattice};

/// How an adjacency entry relates the owning vertex to its neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Non-oriented bond: each side feels the other.
    Undirected,
    /// Oriented edge neighbor → owner: the neighbor's spin enters the owner's field.
    Incoming,
    /// Oriented edge owner → neighbor: the owner influences the neighbor only.
    Outgoing,
}

impl Direction {
    /// Whether the neighbor's spin contributes to the owner's local field.
    #[inline]
    pub fn feeds_field(self) -> bool {
        !matches!(self, Self::Outgoing)
    }
}

/// One adjacency entry of a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub vertex: u32,
    /// Bond weight, multiplied by the model coupling `J`.
    pub weight: f64,
    pub direction: Direction,
}

/// A coupling counted once in the total energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bond {
    pub source: u32,
    pub target: u32,
    pub weight: f64,
    pub oriented: bool,
}

/// Interaction topology shared read-only by every run of an experiment.
///
/// Both variants precompute their neighbor lists at construction; the lists
/// are never mutated afterwards.
#[derive(Debug, Clone)]
pub enum Topology {
    Lattice(Lattice),
    Graph(Graph),
}

impl Topology {
    #[inline]
    pub fn n_vertices(&self) -> usize {
        match self {
            Self::Lattice(l) => l.n_spins,
            Self::Graph(g) => g.n_vertices(),
        }
    }

    /// Neighbor list of `vertex`, in construction order.
    #[inline]
    pub fn neighbors(&self, vertex: usize) -> &[Neighbor] {
        match self {
            Self::Lattice(l) => l.neighbors(vertex),
            Self::Graph(g) => g.neighbors(vertex),
        }
    }

    /// Every coupling exactly once (lattices: forward bonds only).
    pub fn bonds(&self) -> &[Bond] {
        match self {
            Self::Lattice(l) => l.bonds(),
            Self::Graph(g) => g.bonds(),
        }
    }

    pub fn has_oriented_edges(&self) -> bool {
        match self {
            Self::Lattice(_) => false,
            Self::Graph(g) => g.has_oriented_edges(),
        }
    }

    pub fn as_lattice(&self) -> Option<&Lattice> {
        match self {
            Self::Lattice(l) => Some(l),
            Self::Graph(_) => None,
        }
    }
}

impl From<Lattice> for Topology {
    fn from(l: Lattice) -> Self {
        Self::Lattice(l)
    }
}

impl From<Graph> for Topology {
    fn from(g: Graph) -> Self {
        Self::Graph(g)
    }
}
