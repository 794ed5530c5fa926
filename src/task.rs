use crate::{
    aggregator::{Aggregator, Bucket, RawCounts},
    builder::build_templates,
    error::Result,
    matcher::Matcher,
    reader::{parse_counts, read_plan, InputFile},
};
use log::info;
use std::{cmp::Reverse, io::Write, path::PathBuf, time::Instant};

/// How records are folded into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMethod {
    Sequential,
    Parallel,
}

impl AggregateMethod {
    pub fn new(parallel: bool) -> Self {
        if parallel {
            AggregateMethod::Parallel
        } else {
            AggregateMethod::Sequential
        }
    }
}

/// One run: read the plan, build the stage templates, aggregate the counts.
pub struct Task {
    plan: PathBuf,
    counts: PathBuf,
    matcher: Matcher,
    method: AggregateMethod,
    queries_only: bool,
}

impl Task {
    pub fn new<P: Into<PathBuf>, C: Into<PathBuf>>(
        plan: P,
        counts: C,
        budget: Option<u64>,
        parallel: bool,
        queries_only: bool,
    ) -> Self {
        Self {
            plan: plan.into(),
            counts: counts.into(),
            matcher: Matcher::new(budget),
            method: AggregateMethod::new(parallel),
            queries_only,
        }
    }

    /// Run the task and return the buckets by decreasing total.
    pub fn run(&self) -> Result<Vec<Bucket>> {
        let start_time = Instant::now();
        let plan = read_plan(&self.plan)?;
        let templates = build_templates(&plan)?;
        info!("build_time: {}", start_time.elapsed().as_millis());

        let time_now = Instant::now();
        let name = self.counts.display().to_string();
        let input = InputFile::open(&self.counts)?;
        let num_vertices = plan.num_vertices();
        let mut raw = RawCounts::new(&name);
        for record in parse_counts(&name, input.as_str(&name)?, &num_vertices) {
            raw.add(record?)?;
        }
        info!(
            "read_time: {}, distinct_records: {}, input_total: {}",
            time_now.elapsed().as_millis(),
            raw.len(),
            raw.total()
        );

        let time_now = Instant::now();
        let mut aggregator = Aggregator::new(&templates, self.matcher).source(&name);
        if self.queries_only {
            aggregator = aggregator.queries_only(plan.nodes().iter().map(|n| n.is_query()).collect());
        }
        match self.method {
            AggregateMethod::Sequential => {
                for record in raw.into_records() {
                    aggregator.add(&record)?;
                }
            }
            AggregateMethod::Parallel => aggregator.add_parallel(raw.into_records().collect())?,
        }
        info!("{}", aggregator.stats());
        info!(
            "aggregate_time: {}, output_total: {}",
            time_now.elapsed().as_millis(),
            aggregator.total()
        );
        info!("total_time: {}", start_time.elapsed().as_millis());
        Ok(sort_buckets(aggregator.into_buckets()))
    }
}

/// Order buckets by decreasing total, then by their rendering.
pub fn sort_buckets(buckets: Vec<Bucket>) -> Vec<Bucket> {
    let mut keyed: Vec<_> = buckets
        .into_iter()
        .map(|bucket| (Reverse(bucket.total()), bucket.representative().to_string(), bucket))
        .collect();
    keyed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    keyed.into_iter().map(|(_, _, bucket)| bucket).collect()
}

/// Print every bucket followed by a blank line.
pub fn write_buckets<W: Write>(out: &mut W, buckets: &[Bucket]) -> std::io::Result<()> {
    for bucket in buckets {
        writeln!(out, "{}", bucket)?;
    }
    Ok(())
}
