use super::tokens::Tokens;
use crate::{
    error::Result,
    types::{Count, StageId, VLabel},
};

/// One count-file record, before any deduplication.
///
/// `record` is the position of the record in its file, numbered from 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub record: usize,
    pub stage: StageId,
    pub vlabels: Vec<VLabel>,
    pub count: Count,
}

impl RawRecord {
    pub fn new(record: usize, stage: StageId, vlabels: Vec<VLabel>, count: Count) -> Self {
        Self {
            record,
            stage,
            vlabels,
            count,
        }
    }
}

/// The records of a count file, tokenized on demand in file order.
///
/// The first malformed record yields an error and ends the iteration.
pub struct RawRecords<'i, 'p> {
    tokens: Tokens<'i>,
    num_vertices: &'p [usize],
    record: usize,
    failed: bool,
}

impl<'i, 'p> RawRecords<'i, 'p> {
    fn read_record(&mut self) -> Result<RawRecord> {
        let record = self.record;
        let stage: StageId = self.tokens.next(record, "stage id")?;
        let num_vertices = match self.num_vertices.get(stage) {
            Some(&n) => n,
            None => {
                return Err(self.tokens.format_error(
                    record,
                    format!(
                        "unknown stage {}, the plan has {} stages",
                        stage,
                        self.num_vertices.len()
                    ),
                ))
            }
        };
        let vlabels = (0..num_vertices)
            .map(|_| self.tokens.next(record, "vertex label"))
            .collect::<Result<Vec<VLabel>>>()?;
        let count = self.tokens.next(record, "count")?;
        Ok(RawRecord::new(record, stage, vlabels, count))
    }
}

impl<'i, 'p> Iterator for RawRecords<'i, 'p> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.tokens.is_empty() {
            return None;
        }
        let res = self.read_record();
        self.failed = res.is_err();
        self.record += 1;
        Some(res)
    }
}

/// Parse the text of a count file.
///
/// Each record is a stage id, one label per vertex of that stage, and an
/// occurrence count. `num_vertices` gives the vertex count of every stage.
pub fn parse_counts<'i, 'p>(
    name: &str,
    input: &'i str,
    num_vertices: &'p [usize],
) -> RawRecords<'i, 'p> {
    RawRecords {
        tokens: Tokens::new(name, input),
        num_vertices,
        record: 0,
        failed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Err;

    #[test]
    fn test_parse_counts() {
        let records = parse_counts("counts", "0 1 2 3\n1 4 5 6 7\n0 8 9 10\n", &[2, 3])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            records,
            vec![
                RawRecord::new(0, 0, vec![1, 2], 3),
                RawRecord::new(1, 1, vec![4, 5, 6], 7),
                RawRecord::new(2, 0, vec![8, 9], 10),
            ]
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(parse_counts("counts", "\n", &[2]).count(), 0);
    }

    #[test]
    fn test_unknown_stage() {
        let mut records = parse_counts("counts", "0 1 2 3 2 1 1 1", &[2, 2]);
        assert!(records.next().unwrap().is_ok());
        match records.next() {
            Some(Err(Err::InputFormat { file, record, .. })) => {
                assert_eq!(file, "counts");
                assert_eq!(record, 1);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(records.next().is_none());
    }

    #[test]
    fn test_truncated_record() {
        let mut records = parse_counts("counts", "0 1 2 3 1 5 6", &[2, 3]);
        assert!(records.next().unwrap().is_ok());
        assert!(matches!(
            records.next(),
            Some(Err(Err::InputFormat { record: 1, .. }))
        ));
    }

    #[test]
    fn test_non_numeric() {
        let mut records = parse_counts("counts", "0 1 2 3\n0 1 two 3", &[2]);
        assert!(records.next().unwrap().is_ok());
        match records.next() {
            Some(Err(Err::InputFormat {
                file,
                record,
                message,
            })) => {
                assert_eq!(file, "counts");
                assert_eq!(record, 1);
                assert!(message.contains("\"two\" at 2:5"));
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(records.next().is_none());
    }
}
