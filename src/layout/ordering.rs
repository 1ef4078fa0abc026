//! 层内排序: 重心法交替上下扫描, 保留交叉数最少的排列.
use itertools::Itertools;

/// A proper layered graph: every edge joins two adjacent layers. Nodes
/// `0..real` are graph nodes, the rest are virtual bend points of long
/// edges.
#[derive(Debug, Clone)]
pub struct LayeredGraph {
    pub real: usize,
    pub layer_of: Vec<usize>,
    pub layers: Vec<Vec<usize>>,
    /// Neighbours in the layer above.
    pub up: Vec<Vec<usize>>,
    /// Neighbours in the layer below.
    pub down: Vec<Vec<usize>>,
}

impl LayeredGraph {
    /// Splits every edge spanning more than one layer into a chain through
    /// virtual nodes. `edges` must point downwards. Initial order inside a
    /// layer is node index order, so declaration order for real nodes.
    pub fn new(layer_of: &[usize], edges: &[(usize, usize)]) -> Self {
        let real = layer_of.len();
        let mut layer_of = layer_of.to_vec();
        let mut up = vec![Vec::new(); real];
        let mut down = vec![Vec::new(); real];

        for &(from, to) in edges {
            let mut prev = from;
            for layer in layer_of[from] + 1..layer_of[to] {
                let virt = layer_of.len();
                layer_of.push(layer);
                up.push(Vec::new());
                down.push(Vec::new());
                down[prev].push(virt);
                up[virt].push(prev);
                prev = virt;
            }
            down[prev].push(to);
            up[to].push(prev);
        }

        let count = layer_of.iter().max().map_or(0, |&max| max + 1);
        let mut layers = vec![Vec::new(); count];
        for (node, &layer) in layer_of.iter().enumerate() {
            layers[layer].push(node);
        }

        Self {
            real,
            layer_of,
            layers,
            up,
            down,
        }
    }

    pub fn is_virtual(&self, node: usize) -> bool {
        node >= self.real
    }

    fn positions(layers: &[Vec<usize>], nodes: usize) -> Vec<usize> {
        let mut pos = vec![0; nodes];
        for layer in layers {
            for (i, &node) in layer.iter().enumerate() {
                pos[node] = i;
            }
        }
        pos
    }

    /// Total crossings between all pairs of adjacent layers.
    pub fn crossings(&self, layers: &[Vec<usize>]) -> usize {
        let pos = Self::positions(layers, self.layer_of.len());
        layers
            .iter()
            .map(|layer| {
                let segments: Vec<(usize, usize)> = layer
                    .iter()
                    .flat_map(|&from| self.down[from].iter().map(move |&to| (from, to)))
                    .map(|(from, to)| (pos[from], pos[to]))
                    .collect();
                segments
                    .iter()
                    .array_combinations::<2>()
                    .filter(|[(a1, b1), (a2, b2)]| (a1 < a2 && b1 > b2) || (a1 > a2 && b1 < b2))
                    .count()
            })
            .sum()
    }

    /// Alternating barycenter sweeps. Nodes without neighbours on the
    /// reference side keep their current slot as key; sorting is stable, so
    /// the result only depends on the input order.
    pub fn minimize_crossings(&self, sweeps: usize) -> Vec<Vec<usize>> {
        let mut current = self.layers.clone();
        let mut best = current.clone();
        let mut best_crossings = self.crossings(&best);

        for sweep in 0..sweeps {
            if best_crossings == 0 {
                break;
            }
            let downwards = sweep % 2 == 0;
            let order: Vec<usize> = if downwards {
                (1..current.len()).collect()
            } else {
                (0..current.len().saturating_sub(1)).rev().collect()
            };
            for layer in order {
                let pos = Self::positions(&current, self.layer_of.len());
                let neighbours = if downwards { &self.up } else { &self.down };

                let mut keyed: Vec<(f64, usize)> = current[layer]
                    .iter()
                    .enumerate()
                    .map(|(slot, &node)| {
                        let adjacent = &neighbours[node];
                        let key = if adjacent.is_empty() {
                            slot as f64
                        } else {
                            adjacent.iter().map(|&n| pos[n] as f64).sum::<f64>()
                                / adjacent.len() as f64
                        };
                        (key, node)
                    })
                    .collect();
                keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
                current[layer] = keyed.into_iter().map(|(_, node)| node).collect();
            }

            let crossings = self.crossings(&current);
            log::trace!("sweep {}: {} crossings", sweep, crossings);
            if crossings < best_crossings {
                best_crossings = crossings;
                best = current.clone();
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_edges_get_virtual_nodes() {
        let layered = LayeredGraph::new(&[0, 1, 3], &[(0, 1), (0, 2)]);
        assert_eq!(layered.layers.len(), 4);
        assert_eq!(layered.layers[1], vec![1, 3]);
        assert_eq!(layered.layers[2], vec![4]);
        assert!(layered.is_virtual(4));
        assert_eq!(layered.down[4], vec![2]);
    }

    #[test]
    fn counts_a_single_crossing() {
        // 0 -> 3, 1 -> 2 with 2 left of 3.
        let layered = LayeredGraph::new(&[0, 0, 1, 1], &[(0, 3), (1, 2)]);
        assert_eq!(layered.crossings(&layered.layers), 1);
    }

    #[test]
    fn barycenter_untangles_a_swap() {
        let layered = LayeredGraph::new(&[0, 0, 1, 1], &[(0, 3), (1, 2)]);
        let ordered = layered.minimize_crossings(4);
        assert_eq!(layered.crossings(&ordered), 0);
        assert_eq!(ordered[0], vec![0, 1]);
        assert_eq!(ordered[1], vec![3, 2]);
    }

    #[test]
    fn never_worse_than_the_initial_order() {
        let edges = [(0, 4), (0, 5), (1, 3), (2, 3), (2, 5), (1, 4)];
        let layered = LayeredGraph::new(&[0, 0, 0, 1, 1, 1], &edges);
        let initial = layered.crossings(&layered.layers);
        let ordered = layered.minimize_crossings(8);
        assert!(layered.crossings(&ordered) <= initial);
        assert_eq!(ordered, layered.minimize_crossings(8));
    }
}
