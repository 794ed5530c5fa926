use crate::error::{Err, Result};
use pest::{iterators::Pair, Parser, Position};
use pest_derive::Parser;
use std::str::FromStr;

#[derive(Parser)]
#[grammar = "reader/grammar.pest"]
struct IntParser;

/// A cursor over the whitespace-separated tokens of one file.
///
/// Tokens are parsed one at a time at the cursor, so nothing beyond the current
/// token is materialized.
pub(crate) struct Tokens<'i> {
    file: String,
    input: &'i str,
    offset: usize,
}

impl<'i> Tokens<'i> {
    pub(crate) fn new(file: &str, input: &'i str) -> Self {
        Self {
            file: String::from(file),
            input,
            offset: 0,
        }
    }

    pub(crate) fn file(&self) -> &str {
        &self.file
    }

    /// Whether every token has been consumed.
    pub(crate) fn is_empty(&self) -> bool {
        self.peek().map_or(true, |pair| pair.as_rule() == Rule::EOI)
    }

    /// The next token, read as `T`.
    ///
    /// `record` and `what` only serve the error message.
    pub(crate) fn next<T: FromStr>(&mut self, record: usize, what: &str) -> Result<T> {
        let pair = match self.peek() {
            Some(pair) if pair.as_rule() != Rule::EOI => pair,
            _ => {
                return Err(
                    self.format_error(record, format!("unexpected end of file, expected {}", what))
                )
            }
        };
        let start = self.offset + pair.as_span().start();
        self.offset += pair.as_span().end();
        let problem = match pair.as_rule() {
            Rule::int => {
                if let Ok(value) = pair.as_str().parse() {
                    return Ok(value);
                }
                "is out of range"
            }
            _ => "is not an unsigned integer",
        };
        let (line, col) = self.line_col(start);
        Err(self.format_error(
            record,
            format!("{} {:?} at {}:{} {}", what, pair.as_str(), line, col, problem),
        ))
    }

    pub(crate) fn next_flag(&mut self, record: usize, what: &str) -> Result<bool> {
        match self.next::<u8>(record, what)? {
            0 => Ok(false),
            1 => Ok(true),
            flag => Err(self.format_error(record, format!("{} must be 0 or 1, got {}", what, flag))),
        }
    }

    pub(crate) fn format_error(&self, record: usize, message: String) -> Err {
        Err::InputFormat {
            file: self.file.clone(),
            record,
            message,
        }
    }
}

// private methods.
impl<'i> Tokens<'i> {
    /// The token after the cursor, `Rule::EOI` once only whitespace is left.
    fn peek(&self) -> Option<Pair<'i, Rule>> {
        let rest: &'i str = &self.input[self.offset..];
        IntParser::parse(Rule::token, rest)
            .ok()?
            .next()?
            .into_inner()
            .next()
    }

    fn line_col(&self, pos: usize) -> (usize, usize) {
        Position::new(self.input, pos).map_or((0, 0), |pos| pos.line_col())
    }
}
