//! Error management.

use derive_more::Display;

#[derive(Debug, Display, Clone, PartialEq)]
pub enum Err {
    /// The plan contradicts itself.
    #[display(fmt = "structural integrity error: {}", _0)]
    StructuralIntegrity(String),
    /// A record of an input file is malformed or its count does not fit.
    #[display(fmt = "{}: record {}: {}", file, record, message)]
    InputFormat {
        file: String,
        record: usize,
        message: String,
    },
    /// A file is not valid UTF-8 text.
    #[display(fmt = "{}: invalid UTF-8 at byte {}", file, offset)]
    Encoding { file: String, offset: usize },
    /// The isomorphism search tried more pairings than allowed.
    #[display(fmt = "isomorphism search exceeded its budget of {} steps", budget)]
    BudgetExceeded { budget: u64 },
    #[display(fmt = "io error: {}", _0)]
    Io(String),
}

impl std::error::Error for Err {}

impl From<std::io::Error> for Err {
    fn from(e: std::io::Error) -> Self {
        Err::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Err>;
