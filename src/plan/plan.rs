use crate::{
    error::{Err, Result},
    types::{StageId, VId},
};
use std::collections::VecDeque;
use std::ops::Range;

/// One construction stage of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    idx: StageId,
    edge_start: usize,
    num_edges: usize,
    num_vertices: usize,
    is_query: bool,
}

impl PlanNode {
    pub fn new(edge_start: usize, num_edges: usize, num_vertices: usize, is_query: bool) -> Self {
        Self {
            idx: 0,
            edge_start,
            num_edges,
            num_vertices,
            is_query,
        }
    }

    pub fn idx(&self) -> StageId {
        self.idx
    }

    /// The number of vertices of the shape at this stage.
    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn is_query(&self) -> bool {
        self.is_query
    }

    /// The positions of the out edges of this stage in the plan's edge table.
    pub fn edge_range(&self) -> Range<usize> {
        self.edge_start..self.edge_start.saturating_add(self.num_edges)
    }
}

/// One arc added during a transition, in the destination's vertex numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOperation {
    src_key: VId,
    dst_key: VId,
    is_forward: bool,
}

impl PlanOperation {
    pub fn new(src_key: VId, dst_key: VId, is_forward: bool) -> Self {
        Self {
            src_key,
            dst_key,
            is_forward,
        }
    }

    pub fn keys(&self) -> (VId, VId) {
        (self.src_key, self.dst_key)
    }

    pub fn is_forward(&self) -> bool {
        self.is_forward
    }

    /// The oriented arc `(tail, head)`.
    pub fn arc(&self) -> (VId, VId) {
        if self.is_forward {
            (self.src_key, self.dst_key)
        } else {
            (self.dst_key, self.src_key)
        }
    }
}

/// A transition from the shape of `src` to the shape of `dst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEdge {
    src: StageId,
    dst: StageId,
    operations: Vec<PlanOperation>,
}

impl PlanEdge {
    pub fn new(src: StageId, dst: StageId, operations: Vec<PlanOperation>) -> Self {
        Self {
            src,
            dst,
            operations,
        }
    }

    pub fn src(&self) -> StageId {
        self.src
    }

    pub fn dst(&self) -> StageId {
        self.dst
    }

    pub fn operations(&self) -> &[PlanOperation] {
        &self.operations
    }

    /// Operations touching the vertex appended by this transition.
    ///
    /// `src_num_vertices` is the vertex count of the source stage, which is also
    /// the id of the appended vertex.
    pub fn extensions(&self, src_num_vertices: usize) -> impl Iterator<Item = &PlanOperation> {
        self.operations
            .iter()
            .filter(move |op| op.src_key == src_num_vertices || op.dst_key == src_num_vertices)
    }

    /// Operations connecting two vertices that already exist in the source shape.
    pub fn intersections(
        &self,
        src_num_vertices: usize,
    ) -> impl Iterator<Item = &PlanOperation> {
        self.operations
            .iter()
            .filter(move |op| op.src_key < src_num_vertices && op.dst_key < src_num_vertices)
    }
}

/// A rooted DAG of construction stages.
///
/// Edges refer to stages by index, so the plan can be freely cloned and shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    root: StageId,
    nodes: Vec<PlanNode>,
    edges: Vec<PlanEdge>,
}

impl Plan {
    /// Create a plan after checking that it is structurally sound.
    pub fn new(root: StageId, mut nodes: Vec<PlanNode>, edges: Vec<PlanEdge>) -> Result<Self> {
        for (idx, node) in nodes.iter_mut().enumerate() {
            node.idx = idx;
        }
        let plan = Self { root, nodes, edges };
        plan.check()?;
        Ok(plan)
    }

    pub fn root(&self) -> StageId {
        self.root
    }

    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    pub fn node(&self, idx: StageId) -> Option<&PlanNode> {
        self.nodes.get(idx)
    }

    pub fn edges(&self) -> &[PlanEdge] {
        &self.edges
    }

    /// The out edges of a stage.
    pub fn out_edges(&self, idx: StageId) -> &[PlanEdge] {
        self.nodes
            .get(idx)
            .map_or(&[], |node| &self.edges[node.edge_range()])
    }

    /// The vertex count of every stage, indexed by stage id.
    pub fn num_vertices(&self) -> Vec<usize> {
        self.nodes.iter().map(|node| node.num_vertices).collect()
    }
}

fn structural(message: String) -> Err {
    Err::StructuralIntegrity(message)
}

// private methods.
impl Plan {
    fn check(&self) -> Result<()> {
        let root = self
            .nodes
            .get(self.root)
            .ok_or_else(|| structural(format!("root stage {} does not exist", self.root)))?;
        if root.num_vertices != 2 {
            return Err(structural(format!(
                "root stage {} has {} vertices, expected 2",
                self.root, root.num_vertices
            )));
        }
        let mut covered = vec![false; self.edges.len()];
        for node in &self.nodes {
            let end = node
                .edge_start
                .checked_add(node.num_edges)
                .filter(|&end| end <= self.edges.len())
                .ok_or_else(|| {
                    structural(format!(
                        "stage {} refers to {} edges from edge {} but the plan has {} edges",
                        node.idx,
                        node.num_edges,
                        node.edge_start,
                        self.edges.len()
                    ))
                })?;
            for eid in node.edge_start..end {
                self.check_edge(node, eid, &self.edges[eid])?;
                covered[eid] = true;
            }
        }
        if let Some(eid) = covered.iter().position(|&c| !c) {
            return Err(structural(format!(
                "edge {} is not an out edge of any stage",
                eid
            )));
        }
        self.check_acyclic_and_reachable()
    }

    fn check_edge(&self, node: &PlanNode, eid: usize, edge: &PlanEdge) -> Result<()> {
        if edge.src != node.idx {
            return Err(structural(format!(
                "edge {} lies in the range of stage {} but starts at stage {}",
                eid, node.idx, edge.src
            )));
        }
        let dst = self.nodes.get(edge.dst).ok_or_else(|| {
            structural(format!(
                "edge {} leads to stage {} which does not exist",
                eid, edge.dst
            ))
        })?;
        if dst.num_vertices < node.num_vertices || dst.num_vertices - node.num_vertices > 1 {
            return Err(structural(format!(
                "edge {} goes from {} to {} vertices",
                eid, node.num_vertices, dst.num_vertices
            )));
        }
        for op in &edge.operations {
            let (a, b) = op.keys();
            if a >= dst.num_vertices || b >= dst.num_vertices {
                return Err(structural(format!(
                    "edge {} adds arc ({}, {}) to a stage with {} vertices",
                    eid, a, b, dst.num_vertices
                )));
            }
        }
        Ok(())
    }

    fn check_acyclic_and_reachable(&self) -> Result<()> {
        let mut reachable = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        reachable[self.root] = true;
        queue.push_back(self.root);
        while let Some(cur) = queue.pop_front() {
            for edge in self.out_edges(cur) {
                if !reachable[edge.dst] {
                    reachable[edge.dst] = true;
                    queue.push_back(edge.dst);
                }
            }
        }
        if let Some(idx) = reachable.iter().position(|&r| !r) {
            return Err(structural(format!(
                "stage {} is not reachable from root stage {}",
                idx, self.root
            )));
        }
        let mut in_deg = vec![0usize; self.nodes.len()];
        for node in &self.nodes {
            for edge in self.out_edges(node.idx) {
                in_deg[edge.dst] += 1;
            }
        }
        if in_deg[self.root] != 0 {
            return Err(structural(format!(
                "root stage {} has incoming edges",
                self.root
            )));
        }
        let mut visited = 0;
        queue.push_back(self.root);
        while let Some(cur) = queue.pop_front() {
            visited += 1;
            for edge in self.out_edges(cur) {
                in_deg[edge.dst] -= 1;
                if in_deg[edge.dst] == 0 {
                    queue.push_back(edge.dst);
                }
            }
        }
        if visited != self.nodes.len() {
            return Err(structural(String::from("the plan contains a cycle")));
        }
        Ok(())
    }
}
