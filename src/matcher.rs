//! Exact isomorphism test for labeled directed graphs of equal size.

use crate::{
    error::{Err, Result},
    labeled_graph::LabeledGraph,
    types::{VId, VLabel},
};
use itertools::Itertools;
use std::collections::HashMap;

/// Arc multiplicities between every ordered pair of vertices.
struct Adjacency {
    num_vertices: usize,
    mult: Vec<u32>,
    neighbors: Vec<Vec<VId>>,
}

impl Adjacency {
    fn new(graph: &LabeledGraph) -> Self {
        let n = graph.num_vertices();
        let mut mult = vec![0; n * n];
        let mut neighbors = vec![vec![]; n];
        for (src, dst, _) in graph.arcs() {
            mult[src * n + dst] += 1;
            neighbors[src].push(dst);
            neighbors[dst].push(src);
        }
        for ns in &mut neighbors {
            ns.sort_unstable();
            ns.dedup();
        }
        Self {
            num_vertices: n,
            mult,
            neighbors,
        }
    }

    fn arcs(&self, src: VId, dst: VId) -> u32 {
        self.mult[src * self.num_vertices + dst]
    }
}

/// Per-vertex invariants that any isomorphism must preserve.
fn signature(graph: &LabeledGraph, vid: VId) -> (VLabel, usize, usize, usize) {
    (
        graph.vlabel(vid).unwrap_or_default(),
        graph.in_deg(vid).unwrap_or_default(),
        graph.out_deg(vid).unwrap_or_default(),
        graph.self_loops(vid).unwrap_or_default(),
    )
}

/// The order in which pattern vertices get assigned.
///
/// The next vertex is the one most connected to the vertices ordered so far, then
/// the one with the rarest label, then the one with the highest degree.
fn matching_order(graph: &LabeledGraph, adj: &Adjacency) -> Vec<VId> {
    let n = graph.num_vertices();
    let mut label_freq: HashMap<VLabel, usize> = HashMap::new();
    for vlabel in graph.vlabels() {
        *label_freq.entry(vlabel).or_insert(0) += 1;
    }
    let rank = |v: VId| {
        let label = graph.vlabel(v).unwrap_or_default();
        let deg = adj.neighbors[v].len();
        (label_freq[&label], std::cmp::Reverse(deg), v)
    };
    let mut order = Vec::with_capacity(n);
    let mut ordered = vec![false; n];
    let mut links = vec![0usize; n];
    for _ in 0..n {
        let next = (0..n)
            .filter(|&v| !ordered[v])
            .min_by_key(|&v| (std::cmp::Reverse(links[v]), rank(v)));
        if let Some(v) = next {
            ordered[v] = true;
            order.push(v);
            for &w in &adj.neighbors[v] {
                links[w] += 1;
            }
        }
    }
    order
}

struct State<'a> {
    g1: &'a LabeledGraph,
    g2: &'a LabeledGraph,
    adj1: Adjacency,
    adj2: Adjacency,
    order: Vec<VId>,
    core1: Vec<Option<VId>>,
    used2: Vec<bool>,
    steps: u64,
    budget: Option<u64>,
}

impl<'a> State<'a> {
    fn new(g1: &'a LabeledGraph, g2: &'a LabeledGraph, budget: Option<u64>) -> Self {
        let (adj1, adj2) = (Adjacency::new(g1), Adjacency::new(g2));
        let order = matching_order(g1, &adj1);
        Self {
            g1,
            g2,
            adj1,
            adj2,
            order,
            core1: vec![None; g1.num_vertices()],
            used2: vec![false; g2.num_vertices()],
            steps: 0,
            budget,
        }
    }

    fn feasible(&self, depth: usize, u: VId, v: VId) -> bool {
        if signature(self.g1, u) != signature(self.g2, v) {
            return false;
        }
        self.order[..depth].iter().all(|&u2| match self.core1[u2] {
            Some(v2) => {
                self.adj1.arcs(u, u2) == self.adj2.arcs(v, v2)
                    && self.adj1.arcs(u2, u) == self.adj2.arcs(v2, v)
            }
            None => true,
        })
    }

    /// Images of already mapped neighbors of `u` restrict the candidates of `u`.
    fn candidates(&self, u: VId) -> Vec<VId> {
        match self.adj1.neighbors[u]
            .iter()
            .find_map(|&w| self.core1[w])
        {
            Some(image) => self.adj2.neighbors[image].clone(),
            None => (0..self.g2.num_vertices()).collect(),
        }
    }

    fn search(&mut self, depth: usize) -> Result<bool> {
        if depth == self.order.len() {
            return Ok(true);
        }
        let u = self.order[depth];
        for v in self.candidates(u) {
            if self.used2[v] {
                continue;
            }
            self.steps += 1;
            if let Some(budget) = self.budget {
                if self.steps > budget {
                    return Err(Err::BudgetExceeded { budget });
                }
            }
            if !self.feasible(depth, u, v) {
                continue;
            }
            self.core1[u] = Some(v);
            self.used2[v] = true;
            if self.search(depth + 1)? {
                return Ok(true);
            }
            self.core1[u] = None;
            self.used2[v] = false;
        }
        Ok(false)
    }
}

/// An isomorphism tester with an optional step budget.
///
/// A step is one candidate pairing tried during the search. Without a budget the
/// search always terminates with an exact answer, possibly after a long time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Matcher {
    budget: Option<u64>,
}

impl Matcher {
    pub fn new(budget: Option<u64>) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Option<u64> {
        self.budget
    }

    /// Whether `g1` and `g2` are isomorphic.
    ///
    /// Fails with [`Err::BudgetExceeded`] instead of guessing when the search runs
    /// out of steps.
    pub fn check(&self, g1: &LabeledGraph, g2: &LabeledGraph) -> Result<bool> {
        if g1.num_vertices() != g2.num_vertices() || g1.num_edges() != g2.num_edges() {
            return Ok(false);
        }
        let sig1 = (0..g1.num_vertices()).map(|v| signature(g1, v)).sorted();
        let sig2 = (0..g2.num_vertices()).map(|v| signature(g2, v)).sorted();
        if !sig1.eq(sig2) {
            return Ok(false);
        }
        State::new(g1, g2, self.budget).search(0)
    }
}

/// Unbounded isomorphism test.
pub fn is_isomorphic(g1: &LabeledGraph, g2: &LabeledGraph) -> bool {
    matches!(Matcher::default().check(g1, g2), Ok(true))
}
