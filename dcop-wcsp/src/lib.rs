//! Text formats exchanged with the external CCG graph reduction tool.
//!
//! The tool reads a weighted constraint problem in the format written by [`write_wcsp`] and
//! prints a weighted graph together with the mapping between the problem's variables and the
//! graph's vertices, which is read by [`CcgParser`].

use thiserror::Error;

pub mod ccg;
pub mod wcsp;

pub use ccg::{write_ccg, CcgParser, ReducedGraph};
pub use wcsp::{write_wcsp, WcspConstraint, WcspHeader, WcspParser, WcspProblem};

/// Possible errors while parsing WCSP input or CCG output.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("line {}: Invalid header syntax: {}", line, header)]
    InvalidHeader { line: usize, header: String },
    #[error("Input has no header")]
    MissingHeader,
    #[error("line {}: Unexpected line: {}", line, content)]
    UnexpectedLine { line: usize, content: String },
    #[error("line {}: Invalid number: '{}'", line, token)]
    InvalidNumber { line: usize, token: String },
    #[error("line {}: Unexpected end of input", line)]
    UnexpectedEof { line: usize },
    #[error("Section '{}' is not terminated", section)]
    UnterminatedSection { section: &'static str },
    #[error(
        "Input has {} {} while the header specifies {}",
        count,
        what,
        header_count
    )]
    Count {
        what: &'static str,
        count: usize,
        header_count: usize,
    },
}

/// Parse a whitespace separated token as a number.
fn parse_number<T: std::str::FromStr>(line: usize, token: &str) -> Result<T, ParserError> {
    token.parse().map_err(|_| ParserError::InvalidNumber {
        line,
        token: token.to_owned(),
    })
}

/// Write a cost, using an integer representation for integral values.
fn write_cost(target: &mut impl std::io::Write, cost: f64) -> std::io::Result<()> {
    if cost.fract() == 0.0 && cost.abs() < 1e15 {
        itoa::write(&mut *target, cost as i64)?;
        Ok(())
    } else {
        write!(target, "{}", cost)
    }
}
