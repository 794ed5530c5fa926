use super::{tokens::Tokens, InputFile};
use crate::{
    error::Result,
    plan::{Plan, PlanEdge, PlanNode, PlanOperation},
    types::{StageId, VId},
};
use log::info;
use std::path::Path;

const NUM_RESERVED: usize = 3;

/// Read a plan file from disk.
pub fn read_plan<P: AsRef<Path>>(path: P) -> Result<Plan> {
    let name = path.as_ref().display().to_string();
    let input = InputFile::open(&path)?;
    parse_plan(&name, input.as_str(&name)?)
}

/// Parse the text of a plan file.
///
/// Layout: three reserved integers, the root stage, the stage count followed by
/// one `(edge start, edge count, vertex count, query flag)` record per stage, then
/// the edge count followed by one `(src, dst, k, k * (a, b, forward))` record per
/// edge. Records are numbered from 0 in file order, stages first.
pub fn parse_plan(name: &str, input: &str) -> Result<Plan> {
    let mut tokens = Tokens::new(name, input);
    for _ in 0..NUM_RESERVED {
        tokens.next::<u64>(0, "reserved integer")?;
    }
    let root: StageId = tokens.next(0, "root stage")?;
    let num_nodes: usize = tokens.next(0, "stage count")?;
    let mut nodes = Vec::with_capacity(num_nodes.min(input.len()));
    for record in 0..num_nodes {
        let edge_start = tokens.next(record, "edge start")?;
        let num_edges = tokens.next(record, "edge count")?;
        let num_vertices = tokens.next(record, "vertex count")?;
        let is_query = tokens.next_flag(record, "query flag")?;
        nodes.push(PlanNode::new(edge_start, num_edges, num_vertices, is_query));
    }
    let num_edges: usize = tokens.next(num_nodes, "edge count")?;
    let mut edges = Vec::with_capacity(num_edges.min(input.len()));
    for eid in 0..num_edges {
        let record = num_nodes + eid;
        let src: StageId = tokens.next(record, "source stage")?;
        let dst: StageId = tokens.next(record, "destination stage")?;
        let num_operations: usize = tokens.next(record, "operation count")?;
        let mut operations = Vec::with_capacity(num_operations.min(input.len()));
        for _ in 0..num_operations {
            let a: VId = tokens.next(record, "operation vertex")?;
            let b: VId = tokens.next(record, "operation vertex")?;
            let is_forward = tokens.next_flag(record, "direction flag")?;
            operations.push(PlanOperation::new(a, b, is_forward));
        }
        edges.push(PlanEdge::new(src, dst, operations));
    }
    if !tokens.is_empty() {
        return Err(tokens.format_error(
            num_nodes + num_edges,
            String::from("trailing integers after the last edge"),
        ));
    }
    info!(
        "{}: {} stages, {} edges, root {}",
        tokens.file(),
        num_nodes,
        num_edges,
        root
    );
    Plan::new(root, nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Err;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PLAN: &str = "\
0 0 0
0
3
0 1 2 0
1 1 3 1
2 0 3 1
2
0 1 1 1 2 1
1 2 1 0 2 0
";

    #[test]
    fn test_parse_plan() {
        let plan = parse_plan("plan", PLAN).unwrap();
        assert_eq!(plan.root(), 0);
        assert_eq!(plan.num_vertices(), vec![2, 3, 3]);
        assert_eq!(
            plan.nodes().iter().map(|n| n.is_query()).collect::<Vec<_>>(),
            vec![false, true, true]
        );
        assert_eq!(
            plan.edges(),
            &[
                PlanEdge::new(0, 1, vec![PlanOperation::new(1, 2, true)]),
                PlanEdge::new(1, 2, vec![PlanOperation::new(0, 2, false)]),
            ]
        );
    }

    #[test]
    fn test_read_plan() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PLAN.as_bytes()).unwrap();
        assert_eq!(
            read_plan(file.path()).unwrap(),
            parse_plan("plan", PLAN).unwrap()
        );
    }

    #[test]
    fn test_truncated() {
        match parse_plan("plan", "0 0 0 0 3 0 1 2 0") {
            Err(Err::InputFormat { file, record, .. }) => {
                assert_eq!(file, "plan");
                assert_eq!(record, 1);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_bad_flag() {
        assert!(matches!(
            parse_plan("plan", "0 0 0 0 1 0 0 2 7 0"),
            Err(Err::InputFormat { record: 0, .. })
        ));
    }

    #[test]
    fn test_trailing() {
        assert!(matches!(
            parse_plan("plan", "0 0 0 0 1 0 0 2 0 0 9"),
            Err(Err::InputFormat { record: 1, .. })
        ));
    }

    #[test]
    fn test_structural() {
        assert!(matches!(
            parse_plan("plan", "0 0 0 5 1 0 0 2 0 0"),
            Err(Err::StructuralIntegrity(_))
        ));
    }

    #[test]
    fn test_edge_start_overflow() {
        assert!(matches!(
            parse_plan("plan", "0 0 0 0 1 18446744073709551615 1 2 0 0"),
            Err(Err::StructuralIntegrity(_))
        ));
    }

    #[test]
    fn test_non_numeric() {
        match parse_plan("plan", "0 0 0\n0 1\n0 0 two 0\n0\n") {
            Err(Err::InputFormat {
                file,
                record,
                message,
            }) => {
                assert_eq!(file, "plan");
                assert_eq!(record, 0);
                assert!(message.contains("\"two\" at 3:5"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
