//! Readers for the plan file and the count file.
//!
//! Both files are flat sequences of unsigned integers separated by whitespace; the
//! record layout is recovered from the values themselves.

pub use counts::{parse_counts, RawRecord, RawRecords};
pub use input::InputFile;
pub use plan::{parse_plan, read_plan};

mod counts;
mod input;
mod plan;
mod tokens;
