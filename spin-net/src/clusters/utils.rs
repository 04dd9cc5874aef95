use crate::geometry::{Neighbor, Topology};

/// Grow a cluster from `seed` by depth-first expansion over the topology.
///
/// `should_add(site, neighbor)` decides whether a not-yet-visited neighbor
/// joins; it may capture an RNG for probabilistic bond activation. Caller owns
/// the buffers: `in_cluster` must be all-false and `stack` empty. Member
/// vertices are appended to `members` in the order they join, seed first.
#[inline]
pub(super) fn bfs_cluster(
    topology: &Topology,
    seed: usize,
    in_cluster: &mut [bool],
    stack: &mut Vec<usize>,
    members: &mut Vec<u32>,
    mut should_add: impl FnMut(usize, &Neighbor) -> bool,
) {
    in_cluster[seed] = true;
    stack.push(seed);
    members.push(seed as u32);

    while let Some(site) = stack.pop() {
        for nb in topology.neighbors(site) {
            let j = nb.vertex as usize;
            if !in_cluster[j] && should_add(site, nb) {
                in_cluster[j] = true;
                stack.push(j);
                members.push(j as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Edge, Graph, GraphOptions, Lattice};
    use std::collections::HashSet;

    // 4×4 periodic lattice:
    //
    //    0  1  2  3
    //    4  5  6  7
    //    8  9 10 11
    //   12 13 14 15
    //
    // Active bonds: 0-1, 0-4, 3-0 (wraps →), 10-11, 10-14
    // Clusters: {0,1,3,4}, {10,11,14}, 9 singletons

    fn bond_set() -> HashSet<(usize, usize)> {
        [(0, 1), (0, 4), (0, 3), (10, 11), (10, 14)]
            .into_iter()
            .flat_map(|(a, b)| [(a, b), (b, a)])
            .collect()
    }

    fn grow(topology: &Topology, seed: usize, bonds: &HashSet<(usize, usize)>) -> HashSet<usize> {
        let mut in_cluster = vec![false; topology.n_vertices()];
        let mut stack = Vec::new();
        let mut members = Vec::new();
        bfs_cluster(topology, seed, &mut in_cluster, &mut stack, &mut members, |site, nb| {
            bonds.contains(&(site, nb.vertex as usize))
        });
        assert_eq!(members[0] as usize, seed);
        let set: HashSet<usize> = members.iter().map(|&m| m as usize).collect();
        assert_eq!(set.len(), members.len(), "no vertex joins twice");
        for (i, &flag) in in_cluster.iter().enumerate() {
            assert_eq!(flag, set.contains(&i));
        }
        set
    }

    #[test]
    fn test_bfs_bond_based() {
        let topo: Topology = Lattice::new(vec![4, 4]).unwrap().into();
        let bonds = bond_set();

        for seed in [0, 1, 3, 4] {
            assert_eq!(grow(&topo, seed, &bonds), [0, 1, 3, 4].into_iter().collect());
        }
        for seed in [10, 11, 14] {
            assert_eq!(grow(&topo, seed, &bonds), [10, 11, 14].into_iter().collect());
        }
        assert_eq!(grow(&topo, 5, &bonds), [5].into_iter().collect());
    }

    #[test]
    fn test_bfs_accept_all_spans_component() {
        let topo: Topology = Graph::new(
            6,
            vec![
                Edge::undirected(0, 1, 1.0),
                Edge::undirected(1, 2, 1.0),
                Edge::undirected(3, 4, 1.0),
            ],
            GraphOptions::default(),
        )
        .unwrap()
        .into();
        let mut in_cluster = vec![false; 6];
        let mut stack = Vec::new();
        let mut members = Vec::new();
        bfs_cluster(&topo, 2, &mut in_cluster, &mut stack, &mut members, |_, _| true);
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2]);
        assert!(stack.is_empty());
    }
}
