//! Group labeled graphs into isomorphism classes and sum their counts.

use crate::{
    error::{Err, Result},
    labeled_graph::{digest, LabeledGraph},
    matcher::Matcher,
    reader::RawRecord,
    types::{Count, StageId, VLabel},
};
use derive_more::Display;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

/// An isomorphism class with its running total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    representative: LabeledGraph,
    total: Count,
}

impl Bucket {
    pub fn representative(&self) -> &LabeledGraph {
        &self.representative
    }

    pub fn total(&self) -> Count {
        self.total
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Count:{}", self.total)?;
        write!(f, "{}", self.representative)
    }
}

#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
#[display(
    fmt = "records: {}, skipped: {}, oracle_calls: {}, buckets: {}",
    records,
    skipped,
    oracle_calls,
    buckets
)]
pub struct Stats {
    pub records: usize,
    pub skipped: usize,
    pub oracle_calls: usize,
    pub buckets: usize,
}

/// Sum of records sharing the same stage and labels.
///
/// Identical records always describe identical graphs, so summing them up front
/// saves one graph instantiation and the oracle calls that come with it. Each sum
/// remembers the first record it came from.
#[derive(Debug, Default)]
pub struct RawCounts {
    file: String,
    counts: HashMap<(StageId, Vec<VLabel>), (usize, Count)>,
    total: Count,
}

impl RawCounts {
    /// `file` names the source of the records in error messages.
    pub fn new(file: &str) -> Self {
        Self {
            file: String::from(file),
            ..Self::default()
        }
    }

    /// Fails when the total of all records no longer fits a [`Count`].
    pub fn add(&mut self, record: RawRecord) -> Result<()> {
        self.total = add_count(&self.file, &record, self.total)?;
        let sum = self
            .counts
            .entry((record.stage, record.vlabels))
            .or_insert((record.record, 0));
        // bounded by the total
        sum.1 += record.count;
        Ok(())
    }

    /// The number of distinct records.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> Count {
        self.total
    }

    pub fn into_records(self) -> impl Iterator<Item = RawRecord> {
        self.counts
            .into_iter()
            .map(|((stage, vlabels), (record, count))| {
                RawRecord::new(record, stage, vlabels, count)
            })
    }
}

fn add_count(file: &str, record: &RawRecord, total: Count) -> Result<Count> {
    total
        .checked_add(record.count)
        .ok_or_else(|| Err::InputFormat {
            file: String::from(file),
            record: record.record,
            message: format!("count {} overflows the total of {}", record.count, total),
        })
}

/// Add `graph` to the first isomorphic bucket, or open a new one.
///
/// Returns the number of oracle calls made. The caller makes sure that no bucket
/// total can exceed the aggregator total.
fn merge(
    buckets: &mut Vec<Bucket>,
    matcher: &Matcher,
    graph: LabeledGraph,
    count: Count,
) -> Result<usize> {
    for (calls, bucket) in buckets.iter_mut().enumerate() {
        if matcher.check(&bucket.representative, &graph)? {
            bucket.total += count;
            return Ok(calls + 1);
        }
    }
    let calls = buckets.len();
    buckets.push(Bucket {
        representative: graph,
        total: count,
    });
    Ok(calls)
}

/// The two-level table `digest -> buckets`.
///
/// The digest only narrows the search; the matcher decides which bucket a graph
/// belongs to.
pub struct Aggregator<'t> {
    templates: &'t [LabeledGraph],
    matcher: Matcher,
    file: String,
    query_stages: Option<Vec<bool>>,
    buckets: HashMap<u64, Vec<Bucket>>,
    total: Count,
    stats: Stats,
}

impl<'t> Aggregator<'t> {
    pub fn new(templates: &'t [LabeledGraph], matcher: Matcher) -> Self {
        Self {
            templates,
            matcher,
            file: String::from("<records>"),
            query_stages: None,
            buckets: HashMap::new(),
            total: 0,
            stats: Stats::default(),
        }
    }

    /// Name the file the records come from in error messages.
    pub fn source(mut self, file: &str) -> Self {
        self.file = String::from(file);
        self
    }

    /// Skip records whose stage is not flagged in `query_stages`.
    pub fn queries_only(mut self, query_stages: Vec<bool>) -> Self {
        self.query_stages = Some(query_stages);
        self
    }

    /// Apply the labels of `record` to the template of its stage.
    pub fn instantiate(&self, record: &RawRecord) -> Result<LabeledGraph> {
        let template = self
            .templates
            .get(record.stage)
            .ok_or_else(|| {
                self.format_error(
                    record,
                    format!(
                        "unknown stage {}, there are {} stages",
                        record.stage,
                        self.templates.len()
                    ),
                )
            })?;
        let mut graph = template.clone();
        if graph.set_vlabels(&record.vlabels) {
            Ok(graph)
        } else {
            Err(self.format_error(
                record,
                format!(
                    "stage {} has {} vertices but the record has {} labels",
                    record.stage,
                    template.num_vertices(),
                    record.vlabels.len()
                ),
            ))
        }
    }

    pub fn add(&mut self, record: &RawRecord) -> Result<()> {
        if self.skip(record) {
            return Ok(());
        }
        let graph = self.instantiate(record)?;
        self.stats.records += 1;
        self.insert(record, graph)
    }

    /// Add the already labeled graph of `record`.
    pub fn insert(&mut self, record: &RawRecord, graph: LabeledGraph) -> Result<()> {
        let total = add_count(&self.file, record, self.total)?;
        let buckets = self.buckets.entry(digest(&graph)).or_insert_with(Vec::new);
        let before = buckets.len();
        self.stats.oracle_calls += merge(buckets, &self.matcher, graph, record.count)?;
        self.stats.buckets += buckets.len() - before;
        self.total = total;
        Ok(())
    }

    /// Add many records, folding each digest partition on its own rayon worker.
    ///
    /// Every partition is owned by exactly one worker, so the totals match those of
    /// calling [`add`](Self::add) on each record. After an error the aggregator
    /// may have lost buckets and must be discarded.
    pub fn add_parallel(&mut self, records: Vec<RawRecord>) -> Result<()> {
        let mut partitions: HashMap<u64, Vec<(LabeledGraph, Count)>> = HashMap::new();
        let mut total = self.total;
        for record in &records {
            if self.skip(record) {
                continue;
            }
            let graph = self.instantiate(record)?;
            total = add_count(&self.file, record, total)?;
            self.stats.records += 1;
            partitions
                .entry(digest(&graph))
                .or_insert_with(Vec::new)
                .push((graph, record.count));
        }
        debug!("{} digest partitions", partitions.len());
        let work: Vec<_> = partitions
            .into_iter()
            .map(|(key, graphs)| {
                let buckets = self.buckets.remove(&key).unwrap_or_default();
                (key, buckets, graphs)
            })
            .collect();
        let matcher = self.matcher;
        let done = work
            .into_par_iter()
            .map(|(key, mut buckets, graphs)| -> Result<_> {
                let before = buckets.len();
                let mut calls = 0;
                for (graph, count) in graphs {
                    calls += merge(&mut buckets, &matcher, graph, count)?;
                }
                Ok((key, buckets, calls, before))
            })
            .collect::<Result<Vec<_>>>()?;
        for (key, buckets, calls, before) in done {
            self.stats.oracle_calls += calls;
            self.stats.buckets += buckets.len() - before;
            self.buckets.insert(key, buckets);
        }
        self.total = total;
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// The sum of all bucket totals.
    pub fn total(&self) -> Count {
        self.total
    }

    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values().flatten()
    }

    /// The buckets in no particular order.
    pub fn into_buckets(self) -> Vec<Bucket> {
        self.buckets.into_iter().flat_map(|(_, b)| b).collect()
    }
}

// private methods.
impl<'t> Aggregator<'t> {
    fn skip(&mut self, record: &RawRecord) -> bool {
        let skip = match &self.query_stages {
            Some(query_stages) => !query_stages.get(record.stage).copied().unwrap_or(true),
            None => false,
        };
        if skip {
            self.stats.skipped += 1;
        }
        skip
    }

    fn format_error(&self, record: &RawRecord, message: String) -> Err {
        Err::InputFormat {
            file: self.file.clone(),
            record: record.record,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::build_templates,
        plan::{Plan, PlanEdge, PlanNode, PlanOperation},
    };

    /// Stage 0 is the arc 0 -> 1, stage 1 the path 0 -> 1 -> 2, stage 2 the
    /// in-star 0 -> 1 <- 2 and stage 3 the path 2 -> 0 -> 1.
    fn create_templates() -> Vec<LabeledGraph> {
        let plan = Plan::new(
            0,
            vec![
                PlanNode::new(0, 3, 2, false),
                PlanNode::new(3, 0, 3, true),
                PlanNode::new(3, 0, 3, true),
                PlanNode::new(3, 0, 3, true),
            ],
            vec![
                PlanEdge::new(0, 1, vec![PlanOperation::new(1, 2, true)]),
                PlanEdge::new(0, 2, vec![PlanOperation::new(1, 2, false)]),
                PlanEdge::new(0, 3, vec![PlanOperation::new(2, 0, true)]),
            ],
        )
        .unwrap();
        build_templates(&plan).unwrap()
    }

    #[test]
    fn test_merge_across_stages() {
        let templates = create_templates();
        let mut aggregator = Aggregator::new(&templates, Matcher::default());
        // 1 -> 2 -> 3 in both stages.
        aggregator.add(&RawRecord::new(0, 1, vec![1, 2, 3], 3)).unwrap();
        aggregator.add(&RawRecord::new(1, 3, vec![2, 3, 1], 5)).unwrap();
        let buckets = aggregator.into_buckets();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].total(), 8);
        assert_eq!(buckets[0].representative().num_vertices(), 3);
    }

    #[test]
    fn test_no_merge_of_different_shapes() {
        let templates = create_templates();
        let mut aggregator = Aggregator::new(&templates, Matcher::default());
        aggregator.add(&RawRecord::new(0, 1, vec![7, 7, 7], 1)).unwrap();
        aggregator.add(&RawRecord::new(1, 2, vec![7, 7, 7], 2)).unwrap();
        aggregator.add(&RawRecord::new(2, 1, vec![7, 8, 7], 4)).unwrap();
        aggregator.add(&RawRecord::new(3, 3, vec![7, 7, 7], 8)).unwrap();
        let mut totals: Vec<_> = aggregator.buckets().map(|b| b.total()).collect();
        totals.sort();
        assert_eq!(totals, vec![2, 4, 9]);
        assert_eq!(aggregator.total(), 15);
        assert_eq!(aggregator.stats().records, 4);
        assert_eq!(aggregator.stats().buckets, 3);
    }

    #[test]
    fn test_unknown_stage() {
        let templates = create_templates();
        let mut aggregator = Aggregator::new(&templates, Matcher::default()).source("counts");
        aggregator.add(&RawRecord::new(0, 1, vec![1, 2, 3], 1)).unwrap();
        match aggregator.add(&RawRecord::new(7, 4, vec![1, 2, 3], 1)) {
            Err(Err::InputFormat { file, record, .. }) => {
                assert_eq!(file, "counts");
                assert_eq!(record, 7);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            aggregator.add(&RawRecord::new(9, 0, vec![1, 2, 3], 1)),
            Err(Err::InputFormat { record: 9, .. })
        ));
    }

    #[test]
    fn test_queries_only() {
        let templates = create_templates();
        let mut aggregator = Aggregator::new(&templates, Matcher::default())
            .queries_only(vec![false, true, true, true]);
        aggregator.add(&RawRecord::new(0, 0, vec![1, 2], 10)).unwrap();
        aggregator.add(&RawRecord::new(1, 1, vec![1, 2, 3], 1)).unwrap();
        assert_eq!(aggregator.total(), 1);
        assert_eq!(aggregator.stats().skipped, 1);
    }

    fn create_records() -> Vec<RawRecord> {
        let mut records = vec![];
        for i in 0..60u32 {
            let stage = 1 + (i as usize % 3);
            records.push(RawRecord::new(
                i as usize,
                stage,
                vec![i % 2, (i / 2) % 3, i % 4],
                u64::from(i) + 1,
            ));
        }
        records
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let templates = create_templates();
        let records = create_records();
        let mut sequential = Aggregator::new(&templates, Matcher::default());
        for record in &records {
            sequential.add(record).unwrap();
        }
        let mut parallel = Aggregator::new(&templates, Matcher::default());
        let (head, tail) = records.split_at(17);
        parallel.add_parallel(head.to_vec()).unwrap();
        parallel.add_parallel(tail.to_vec()).unwrap();
        let input: Count = records.iter().map(|r| r.count).sum();
        assert_eq!(sequential.total(), input);
        assert_eq!(parallel.total(), input);
        assert_eq!(sequential.stats().buckets, parallel.stats().buckets);
        let mut a: Vec<_> = sequential.buckets().map(|b| b.total()).collect();
        let mut b: Vec<_> = parallel.buckets().map(|b| b.total()).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_raw_counts() {
        let mut raw = RawCounts::new("counts");
        raw.add(RawRecord::new(0, 2, vec![1, 2, 3], 1)).unwrap();
        raw.add(RawRecord::new(1, 1, vec![1, 2, 3], 2)).unwrap();
        raw.add(RawRecord::new(2, 1, vec![1, 2, 3], 5)).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.total(), 8);
        let mut records: Vec<_> = raw.into_records().collect();
        records.sort_by_key(|r| r.stage);
        assert_eq!(records[0], RawRecord::new(1, 1, vec![1, 2, 3], 7));
    }

    #[test]
    fn test_raw_counts_overflow() {
        let mut raw = RawCounts::new("counts");
        raw.add(RawRecord::new(0, 0, vec![1, 2], Count::MAX)).unwrap();
        match raw.add(RawRecord::new(1, 0, vec![1, 2], 1)) {
            Err(Err::InputFormat { file, record, .. }) => {
                assert_eq!(file, "counts");
                assert_eq!(record, 1);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(raw.total(), Count::MAX);
        assert!(matches!(
            raw.add(RawRecord::new(2, 1, vec![1, 2, 3], 1)),
            Err(Err::InputFormat { record: 2, .. })
        ));
    }

    #[test]
    fn test_total_overflow() {
        let templates = create_templates();
        let mut aggregator = Aggregator::new(&templates, Matcher::default());
        // isomorphic records from two stages
        aggregator.add(&RawRecord::new(0, 1, vec![1, 2, 3], Count::MAX)).unwrap();
        assert!(matches!(
            aggregator.add(&RawRecord::new(1, 3, vec![2, 3, 1], 1)),
            Err(Err::InputFormat { record: 1, .. })
        ));
        // a bucket of its own
        assert!(matches!(
            aggregator.add(&RawRecord::new(2, 0, vec![4, 4], 1)),
            Err(Err::InputFormat { record: 2, .. })
        ));
        assert_eq!(aggregator.total(), Count::MAX);
        let totals: Vec<_> = aggregator.buckets().map(|b| b.total()).collect();
        assert_eq!(totals, vec![Count::MAX]);

        let mut parallel = Aggregator::new(&templates, Matcher::default());
        assert!(matches!(
            parallel.add_parallel(vec![
                RawRecord::new(0, 1, vec![1, 2, 3], Count::MAX),
                RawRecord::new(1, 3, vec![2, 3, 1], 1),
            ]),
            Err(Err::InputFormat { record: 1, .. })
        ));
    }

    #[test]
    fn test_budget_propagates() {
        let mut a = LabeledGraph::new();
        let mut b = LabeledGraph::new();
        for g in [&mut a, &mut b].iter_mut() {
            for _ in 0..6 {
                g.add_vertex(0);
            }
            for v in 0..6 {
                g.add_arc(v, (v + 1) % 6);
            }
        }
        let templates: Vec<LabeledGraph> = vec![];
        let mut aggregator = Aggregator::new(&templates, Matcher::new(Some(1)));
        aggregator.insert(&RawRecord::new(0, 0, vec![], 1), a).unwrap();
        assert_eq!(
            aggregator.insert(&RawRecord::new(1, 0, vec![], 1), b),
            Err(Err::BudgetExceeded { budget: 1 })
        );
        assert_eq!(aggregator.total(), 1);
    }
}
