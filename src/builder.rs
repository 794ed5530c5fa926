//! Reconstruct the unlabeled shape of every plan stage.

use crate::{
    error::{Err, Result},
    labeled_graph::LabeledGraph,
    plan::{Plan, PlanEdge},
    types::StageId,
};
use log::debug;
use std::collections::VecDeque;

/// Build one template graph per stage, indexed by stage id.
///
/// The root shape is the single arc `0 -> 1`. Every plan edge copies its source
/// shape, appends a vertex when the destination is larger, then adds one arc per
/// operation. A stage reached through several plan edges must be rebuilt
/// identically by each of them.
pub fn build_templates(plan: &Plan) -> Result<Vec<LabeledGraph>> {
    let mut templates: Vec<Option<(LabeledGraph, StageId)>> = vec![None; plan.nodes().len()];
    let root = plan.root();
    let mut seed = LabeledGraph::with_vertices(2);
    seed.add_arc(0, 1);
    *templates.get_mut(root).ok_or_else(|| missing_stage(root))? = Some((seed, root));
    let mut queue = VecDeque::new();
    queue.push_back(root);
    while let Some(cur) = queue.pop_front() {
        let parent = match &templates[cur] {
            Some((graph, _)) => graph.clone(),
            None => return Err(missing_stage(cur)),
        };
        for edge in plan.out_edges(cur) {
            let child = extend(plan, &parent, edge)?;
            let slot = templates
                .get_mut(edge.dst())
                .ok_or_else(|| missing_stage(edge.dst()))?;
            match slot {
                None => {
                    debug!(
                        "stage {} built from stage {}: {} vertices, {} arcs",
                        edge.dst(),
                        cur,
                        child.num_vertices(),
                        child.num_edges()
                    );
                    *slot = Some((child, cur));
                    queue.push_back(edge.dst());
                }
                Some((existing, first_parent)) => {
                    if !existing.same_shape(&child) {
                        return Err(Err::StructuralIntegrity(format!(
                            "stage {} is rebuilt differently from stage {} and stage {}",
                            edge.dst(),
                            first_parent,
                            cur
                        )));
                    }
                    debug!("stage {} rebuilt identically from stage {}", edge.dst(), cur);
                }
            }
        }
    }
    templates
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            let (graph, _) = slot.ok_or_else(|| {
                Err::StructuralIntegrity(format!("stage {} is never built", idx))
            })?;
            let expected = plan.nodes()[idx].num_vertices();
            if graph.num_vertices() == expected {
                Ok(graph)
            } else {
                Err(Err::StructuralIntegrity(format!(
                    "stage {} is built with {} vertices but records {}",
                    idx,
                    graph.num_vertices(),
                    expected
                )))
            }
        })
        .collect()
}

fn missing_stage(idx: StageId) -> Err {
    Err::StructuralIntegrity(format!("stage {} does not exist", idx))
}

fn extend(plan: &Plan, parent: &LabeledGraph, edge: &PlanEdge) -> Result<LabeledGraph> {
    let (src, dst) = match (plan.node(edge.src()), plan.node(edge.dst())) {
        (Some(src), Some(dst)) => (src, dst),
        (None, _) => return Err(missing_stage(edge.src())),
        (_, None) => return Err(missing_stage(edge.dst())),
    };
    let mut child = parent.clone();
    match dst.num_vertices().checked_sub(src.num_vertices()) {
        Some(0) => {}
        Some(1) => {
            child.add_vertex(Default::default());
        }
        _ => {
            return Err(Err::StructuralIntegrity(format!(
                "stage {} has {} vertices but its parent stage {} has {}",
                dst.idx(),
                dst.num_vertices(),
                src.idx(),
                src.num_vertices()
            )))
        }
    }
    for op in edge.operations() {
        let (tail, head) = op.arc();
        if !child.add_arc(tail, head) {
            return Err(Err::StructuralIntegrity(format!(
                "arc ({}, {}) does not fit stage {} with {} vertices",
                tail,
                head,
                dst.idx(),
                child.num_vertices()
            )));
        }
    }
    Ok(child)
}
