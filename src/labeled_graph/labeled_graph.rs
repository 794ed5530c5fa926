use crate::types::{ELabel, VId, VLabel};
use itertools::Itertools;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GraphNode {
    vlabel: VLabel,
    in_deg: usize,
    out_deg: usize,
    self_loops: usize,
}

impl GraphNode {
    fn new(vlabel: VLabel) -> GraphNode {
        GraphNode {
            vlabel,
            ..Default::default()
        }
    }
}

/// An iterator over the arcs of a labeled graph.
pub struct Arcs<'a> {
    arcs: std::slice::Iter<'a, (VId, VId, ELabel)>,
}

impl<'a> Iterator for Arcs<'a> {
    type Item = (VId, VId, ELabel);

    fn next(&mut self) -> Option<Self::Item> {
        self.arcs.next().copied()
    }
}

impl<'a> ExactSizeIterator for Arcs<'a> {
    fn len(&self) -> usize {
        self.arcs.len()
    }
}

/// A directed graph whose vertices carry integer labels.
///
/// Vertices are numbered `0..n` in the order they were added. Parallel arcs and
/// self-loops are kept as they are. Each arc carries an edge label which is always
/// `0` today; nothing in the matching logic relies on it being anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabeledGraph {
    vertices: Vec<GraphNode>,
    arcs: Vec<(VId, VId, ELabel)>,
}

impl LabeledGraph {
    /// Create a new empty labeled graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with `num_vertices` unlabeled vertices and no arcs.
    pub fn with_vertices(num_vertices: usize) -> Self {
        Self {
            vertices: vec![GraphNode::default(); num_vertices],
            arcs: Vec::new(),
        }
    }

    /// Append a vertex and return its id.
    pub fn add_vertex(&mut self, vlabel: VLabel) -> VId {
        self.vertices.push(GraphNode::new(vlabel));
        self.vertices.len() - 1
    }

    /// Add the arc `src -> dst` with the default edge label.
    pub fn add_arc(&mut self, src: VId, dst: VId) -> bool {
        self.add_labeled_arc(src, dst, ELabel::default())
    }

    pub fn add_labeled_arc(&mut self, src: VId, dst: VId, elabel: ELabel) -> bool {
        if src < self.vertices.len() && dst < self.vertices.len() {
            self.vertices[src].out_deg += 1;
            self.vertices[dst].in_deg += 1;
            if src == dst {
                self.vertices[src].self_loops += 1;
            }
            self.arcs.push((src, dst, elabel));
            true
        } else {
            false
        }
    }

    /// Overwrite the vertex labels in vertex id order.
    ///
    /// Returns `false` and leaves the graph untouched when the number of labels
    /// does not match the number of vertices.
    pub fn set_vlabels(&mut self, vlabels: &[VLabel]) -> bool {
        if vlabels.len() != self.vertices.len() {
            return false;
        }
        for (node, &vlabel) in self.vertices.iter_mut().zip(vlabels) {
            node.vlabel = vlabel;
        }
        true
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.arcs.len()
    }

    pub fn vlabel(&self, vid: VId) -> Option<VLabel> {
        self.vertices.get(vid).map(|node| node.vlabel)
    }

    pub fn vlabels(&self) -> impl Iterator<Item = VLabel> + '_ {
        self.vertices.iter().map(|node| node.vlabel)
    }

    pub fn in_deg(&self, vid: VId) -> Option<usize> {
        self.vertices.get(vid).map(|node| node.in_deg)
    }

    pub fn out_deg(&self, vid: VId) -> Option<usize> {
        self.vertices.get(vid).map(|node| node.out_deg)
    }

    pub fn self_loops(&self, vid: VId) -> Option<usize> {
        self.vertices.get(vid).map(|node| node.self_loops)
    }

    /// The arcs in insertion order.
    pub fn arcs(&self) -> Arcs {
        Arcs {
            arcs: self.arcs.iter(),
        }
    }

    /// Whether both graphs have the same vertices and the same multiset of arcs
    /// under the identity numbering. Labels are ignored.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.num_vertices() == other.num_vertices()
            && self.num_edges() == other.num_edges()
            && self.arcs.iter().sorted().eq(other.arcs.iter().sorted())
    }
}

impl std::fmt::Display for LabeledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {}", self.num_vertices(), self.num_edges())?;
        writeln!(f, "{}", self.vlabels().join(" "))?;
        for (src, dst, _) in self.arcs() {
            writeln!(f, "{} {}", src, dst)?;
        }
        Ok(())
    }
}
