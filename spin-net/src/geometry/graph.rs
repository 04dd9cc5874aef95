use std::collections::HashMap;
use std::hash::Hash;

use super::topology::{Bond, Direction, Neighbor};
use crate::error::{Error, Result};

/// One coupling of an explicit edge list.
///
/// An oriented edge `source → target` means the source influences the target:
/// the source spin enters the target's local field, not the other way round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
    pub oriented: bool,
}

impl Edge {
    pub fn undirected(source: usize, target: usize, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
            oriented: false,
        }
    }

    pub fn oriented(source: usize, target: usize, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
            oriented: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    /// Accept `v -- v` edges. They only shift the total energy by a constant
    /// and never enter a local field.
    pub allow_self_loops: bool,
}

/// General interaction graph in compressed adjacency form.
#[derive(Debug, Clone)]
pub struct Graph {
    n_vertices: usize,
    bonds: Vec<Bond>,
    /// `adjacency[offsets[v]..offsets[v + 1]]` is the neighbor list of `v`.
    offsets: Vec<usize>,
    adjacency: Vec<Neighbor>,
    n_oriented: usize,
}

impl Graph {
    pub fn new(n_vertices: usize, edges: Vec<Edge>, options: GraphOptions) -> Result<Self> {
        if n_vertices == 0 {
            return Err(Error::Configuration("graph has no vertices".into()));
        }
        if n_vertices > u32::MAX as usize {
            return Err(Error::Configuration(format!(
                "graph with {n_vertices} vertices exceeds the u32 index range"
            )));
        }
        if edges.is_empty() {
            return Err(Error::Configuration("graph has no edges".into()));
        }

        for (idx, e) in edges.iter().enumerate() {
            if e.source >= n_vertices || e.target >= n_vertices {
                return Err(Error::Topology(format!(
                    "edge {idx} ({} -> {}) references a vertex outside 0..{n_vertices}",
                    e.source, e.target
                )));
            }
            if !e.weight.is_finite() {
                return Err(Error::Topology(format!(
                    "edge {idx} has non-finite weight {}",
                    e.weight
                )));
            }
            if e.source == e.target && !options.allow_self_loops {
                return Err(Error::Configuration(format!(
                    "edge {idx} is a self-loop on vertex {} and self-coupling is disabled",
                    e.source
                )));
            }
        }

        // Two passes: degrees, then fill, so neighbor order follows edge order.
        let mut degree = vec![0usize; n_vertices];
        for e in edges.iter().filter(|e| e.source != e.target) {
            degree[e.source] += 1;
            degree[e.target] += 1;
        }
        let mut offsets = Vec::with_capacity(n_vertices + 1);
        offsets.push(0);
        for d in &degree {
            offsets.push(offsets.last().copied().unwrap_or(0) + d);
        }

        let placeholder = Neighbor {
            vertex: 0,
            weight: 0.0,
            direction: Direction::Undirected,
        };
        let mut adjacency = vec![placeholder; offsets[n_vertices]];
        let mut cursor = offsets[..n_vertices].to_vec();
        let mut push = |owner: usize, nb: Neighbor| {
            adjacency[cursor[owner]] = nb;
            cursor[owner] += 1;
        };

        for e in edges.iter().filter(|e| e.source != e.target) {
            let (at_source, at_target) = if e.oriented {
                (Direction::Outgoing, Direction::Incoming)
            } else {
                (Direction::Undirected, Direction::Undirected)
            };
            push(
                e.source,
                Neighbor {
                    vertex: e.target as u32,
                    weight: e.weight,
                    direction: at_source,
                },
            );
            push(
                e.target,
                Neighbor {
                    vertex: e.source as u32,
                    weight: e.weight,
                    direction: at_target,
                },
            );
        }

        let n_oriented = edges.iter().filter(|e| e.oriented).count();
        let bonds = edges
            .iter()
            .map(|e| Bond {
                source: e.source as u32,
                target: e.target as u32,
                weight: e.weight,
                oriented: e.oriented,
            })
            .collect();

        Ok(Self {
            n_vertices,
            bonds,
            offsets,
            adjacency,
            n_oriented,
        })
    }

    /// Build from edges between arbitrary vertex labels (e.g. node IDs handed
    /// over by a network loader). Vertices are numbered in order of first
    /// appearance; the returned vector maps index → label.
    pub fn from_labeled_edges<K, I>(
        edges: I,
        oriented: bool,
        options: GraphOptions,
    ) -> Result<(Self, Vec<K>)>
    where
        K: Eq + Hash + Clone,
        I: IntoIterator<Item = (K, K, f64)>,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut intern = |k: K| {
            *index.entry(k.clone()).or_insert_with(|| {
                labels.push(k);
                labels.len() - 1
            })
        };
        let edges: Vec<Edge> = edges
            .into_iter()
            .map(|(a, b, w)| {
                let (source, target) = (intern(a), intern(b));
                Edge {
                    source,
                    target,
                    weight: w,
                    oriented,
                }
            })
            .collect();
        let graph = Self::new(labels.len(), edges, options)?;
        Ok((graph, labels))
    }

    /// Build over a fixed vertex list (isolated vertices allowed). An edge
    /// naming a label that is not in `vertices` is a [`Error::Topology`].
    pub fn with_vertices<K>(
        vertices: &[K],
        edges: &[(K, K, f64)],
        oriented: bool,
        options: GraphOptions,
    ) -> Result<Self>
    where
        K: Eq + Hash + std::fmt::Debug,
    {
        let index: HashMap<&K, usize> = vertices.iter().enumerate().map(|(i, k)| (k, i)).collect();
        if index.len() != vertices.len() {
            return Err(Error::Topology("vertex list contains duplicate labels".into()));
        }
        let lookup = |k: &K| {
            index
                .get(k)
                .copied()
                .ok_or_else(|| Error::Topology(format!("edge references unknown vertex {k:?}")))
        };
        let edges = edges
            .iter()
            .map(|(a, b, w)| {
                Ok(Edge {
                    source: lookup(a)?,
                    target: lookup(b)?,
                    weight: *w,
                    oriented,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(vertices.len(), edges, options)
    }

    #[inline]
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    pub fn n_edges(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn neighbors(&self, vertex: usize) -> &[Neighbor] {
        &self.adjacency[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn has_oriented_edges(&self) -> bool {
        self.n_oriented > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_edge_appears_on_both_ends() {
        let g = Graph::new(
            3,
            vec![Edge::oriented(0, 1, 2.0), Edge::undirected(1, 2, 1.0)],
            GraphOptions::default(),
        )
        .unwrap();

        assert_eq!(
            g.neighbors(0),
            &[Neighbor {
                vertex: 1,
                weight: 2.0,
                direction: Direction::Outgoing
            }]
        );
        let n1 = g.neighbors(1);
        assert_eq!(n1.len(), 2);
        assert_eq!(n1[0].vertex, 0);
        assert_eq!(n1[0].direction, Direction::Incoming);
        assert_eq!(n1[1].vertex, 2);
        assert_eq!(n1[1].direction, Direction::Undirected);
        assert!(g.has_oriented_edges());
        assert_eq!(g.n_edges(), 2);
    }

    #[test]
    fn test_construction_errors() {
        let opts = GraphOptions::default();
        assert!(matches!(Graph::new(0, vec![], opts), Err(Error::Configuration(_))));
        assert!(matches!(Graph::new(3, vec![], opts), Err(Error::Configuration(_))));
        assert!(matches!(
            Graph::new(3, vec![Edge::undirected(0, 3, 1.0)], opts),
            Err(Error::Topology(_))
        ));
        assert!(matches!(
            Graph::new(3, vec![Edge::undirected(0, 1, f64::INFINITY)], opts),
            Err(Error::Topology(_))
        ));
        assert!(matches!(
            Graph::new(3, vec![Edge::undirected(1, 1, 1.0)], opts),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_self_loop_when_enabled() {
        let g = Graph::new(
            2,
            vec![Edge::undirected(0, 0, 1.0), Edge::undirected(0, 1, 1.0)],
            GraphOptions {
                allow_self_loops: true,
            },
        )
        .unwrap();
        // kept as a bond, but never listed as a neighbor
        assert_eq!(g.bonds().len(), 2);
        assert_eq!(g.neighbors(0).len(), 1);
    }

    #[test]
    fn test_labeled_construction() {
        let (g, labels) = Graph::from_labeled_edges(
            vec![("alice", "bob", 1.0), ("bob", "carol", 1.0)],
            false,
            GraphOptions::default(),
        )
        .unwrap();
        assert_eq!(labels, vec!["alice", "bob", "carol"]);
        assert_eq!(g.neighbors(1).len(), 2);

        let g = Graph::with_vertices(
            &["a", "b", "c", "d"],
            &[("a", "b", 1.0)],
            true,
            GraphOptions::default(),
        )
        .unwrap();
        assert_eq!(g.n_vertices(), 4);
        assert!(g.neighbors(3).is_empty());

        let err = Graph::with_vertices(
            &["a", "b"],
            &[("a", "z", 1.0)],
            false,
            GraphOptions::default(),
        );
        assert!(matches!(err, Err(Error::Topology(_))));
    }
}
