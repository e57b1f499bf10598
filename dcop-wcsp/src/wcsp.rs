//! Weighted constraint problems as read by the reduction tool.
//!
//! ```text
//! edges <var count> <max domain size> <constraint count> <big M>
//! <domain size of each variable>
//! <arity> <scope var ids...> <default cost> <tuple count>
//! <domain position per scope var...> <cost>
//! ...
//! ```
//!
//! Variable ids are the 0-based insertion order of the variables. Tuples list positions within the
//! domains, not domain values.
use std::io::{self, Read};

use anyhow::Error;

use dcop_instance::Instance;

use crate::{parse_number, write_cost, ParserError};

/// Sizes present in the first line of a WCSP file.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WcspHeader {
    pub var_count: usize,
    pub max_domain_size: usize,
    pub constraint_count: usize,
    pub big_m: u64,
}

/// A constraint as listed in a WCSP file.
#[derive(Clone, Debug, PartialEq)]
pub struct WcspConstraint {
    pub scope: Vec<usize>,
    pub default_cost: f64,
    pub tuples: Vec<(Vec<usize>, f64)>,
}

/// A complete WCSP file.
#[derive(Clone, Debug, PartialEq)]
pub struct WcspProblem {
    pub header: WcspHeader,
    pub domain_sizes: Vec<usize>,
    pub constraints: Vec<WcspConstraint>,
}

/// Write the header line.
pub fn write_wcsp_header(target: &mut impl io::Write, header: WcspHeader) -> io::Result<()> {
    writeln!(
        target,
        "edges {var_count} {max_domain_size} {constraint_count} {big_m}",
        var_count = header.var_count,
        max_domain_size = header.max_domain_size,
        constraint_count = header.constraint_count,
        big_m = header.big_m,
    )
}

/// Write an instance as WCSP.
///
/// Explicit tuples of each constraint are written in lexicographic order of their domain
/// positions.
pub fn write_wcsp(target: &mut impl io::Write, instance: &Instance, big_m: u64) -> io::Result<()> {
    write_wcsp_header(
        &mut *target,
        WcspHeader {
            var_count: instance.variables().len(),
            max_domain_size: instance.max_domain_size(),
            constraint_count: instance.constraints().len(),
            big_m,
        },
    )?;

    for variable in instance.variables() {
        itoa::write(&mut *target, variable.domain_size())?;
        target.write_all(b" ")?;
    }
    target.write_all(b"\n")?;

    for constraint in instance.constraints() {
        let mut tuples = vec![];
        for (tuple, cost) in constraint.entries() {
            let mut positions = Vec::with_capacity(tuple.len());
            for (&value, &var) in tuple.iter().zip(constraint.scope()) {
                let variable = instance.variable(var);
                let position = variable.position(value).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "value {} not in the domain of '{}'",
                            value,
                            variable.name()
                        ),
                    )
                })?;
                positions.push(position);
            }
            tuples.push((positions, cost));
        }
        tuples.sort_by(|a, b| a.0.cmp(&b.0));

        itoa::write(&mut *target, constraint.arity())?;
        target.write_all(b" ")?;
        for &var in constraint.scope() {
            itoa::write(&mut *target, var.index())?;
            target.write_all(b" ")?;
        }
        write_cost(&mut *target, constraint.default_cost())?;
        target.write_all(b" ")?;
        itoa::write(&mut *target, tuples.len())?;
        target.write_all(b"\n")?;

        for (positions, cost) in tuples {
            for position in positions {
                itoa::write(&mut *target, position)?;
                target.write_all(b" ")?;
            }
            write_cost(&mut *target, cost)?;
            target.write_all(b"\n")?;
        }
    }

    Ok(())
}

/// Parser for WCSP files.
pub struct WcspParser<'a> {
    lines: Vec<(usize, Vec<&'a str>)>,
    position: usize,
}

impl<'a> WcspParser<'a> {
    /// Parse a complete WCSP file.
    pub fn parse(mut input: impl Read) -> Result<WcspProblem, Error> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(WcspParser::parse_str(&text)?)
    }

    /// Parse WCSP text held in memory.
    pub fn parse_str(text: &'a str) -> Result<WcspProblem, ParserError> {
        let mut parser = WcspParser {
            lines: text
                .lines()
                .enumerate()
                .map(|(index, line)| (index + 1, line.split_whitespace().collect::<Vec<_>>()))
                .filter(|(_, tokens)| !tokens.is_empty())
                .collect(),
            position: 0,
        };

        let header = parser.header()?;

        let (line, tokens) = parser.next_line()?;
        let domain_sizes = tokens
            .iter()
            .map(|token| parse_number(line, token))
            .collect::<Result<Vec<usize>, _>>()?;
        if domain_sizes.len() != header.var_count {
            return Err(ParserError::Count {
                what: "domain sizes",
                count: domain_sizes.len(),
                header_count: header.var_count,
            });
        }

        let mut constraints = vec![];
        while parser.position < parser.lines.len() {
            constraints.push(parser.constraint()?);
        }
        if constraints.len() != header.constraint_count {
            return Err(ParserError::Count {
                what: "constraints",
                count: constraints.len(),
                header_count: header.constraint_count,
            });
        }

        Ok(WcspProblem {
            header,
            domain_sizes,
            constraints,
        })
    }

    fn next_line(&mut self) -> Result<(usize, Vec<&'a str>), ParserError> {
        match self.lines.get(self.position) {
            Some((line, tokens)) => {
                self.position += 1;
                Ok((*line, tokens.clone()))
            }
            None => Err(ParserError::UnexpectedEof {
                line: self.lines.last().map_or(0, |(line, _)| *line) + 1,
            }),
        }
    }

    fn header(&mut self) -> Result<WcspHeader, ParserError> {
        if self.lines.is_empty() {
            return Err(ParserError::MissingHeader);
        }
        let (line, tokens) = self.next_line()?;
        let invalid = || ParserError::InvalidHeader {
            line,
            header: tokens.join(" "),
        };
        if tokens.len() != 5 || tokens[0] != "edges" {
            return Err(invalid());
        }
        let numbers = tokens[1..]
            .iter()
            .map(|token| token.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WcspHeader {
            var_count: numbers[0] as usize,
            max_domain_size: numbers[1] as usize,
            constraint_count: numbers[2] as usize,
            big_m: numbers[3],
        })
    }

    fn constraint(&mut self) -> Result<WcspConstraint, ParserError> {
        let (line, tokens) = self.next_line()?;
        let arity: usize = parse_number(line, tokens[0])?;
        if tokens.len() != arity + 3 {
            return Err(ParserError::UnexpectedLine {
                line,
                content: tokens.join(" "),
            });
        }
        let scope = tokens[1..=arity]
            .iter()
            .map(|token| parse_number(line, token))
            .collect::<Result<Vec<usize>, _>>()?;
        let default_cost = parse_number(line, tokens[arity + 1])?;
        let tuple_count: usize = parse_number(line, tokens[arity + 2])?;

        let mut tuples = Vec::with_capacity(tuple_count);
        for _ in 0..tuple_count {
            let (line, tokens) = self.next_line()?;
            if tokens.len() != arity + 1 {
                return Err(ParserError::UnexpectedLine {
                    line,
                    content: tokens.join(" "),
                });
            }
            let positions = tokens[..arity]
                .iter()
                .map(|token| parse_number(line, token))
                .collect::<Result<Vec<usize>, _>>()?;
            let cost = parse_number(line, tokens[arity])?;
            tuples.push((positions, cost));
        }

        Ok(WcspConstraint {
            scope,
            default_cost,
            tuples,
        })
    }
}
