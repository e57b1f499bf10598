//! Constraint composite graphs as printed by the reduction tool.
//!
//! The relevant parts of the output are
//!
//! ```text
//! --- Non-Boolean Variable Mapping BEGINS ---
//! <variable id> <boolean node ids...>
//! --- Non-Boolean Variable Mapping ENDS ---
//! p edges <vertex count> <edge count>
//! v <vertex id> <weight>
//! e <vertex id> <vertex id>
//! --- vertex types begin ---
//! <vertex id> <boolean node id, negative for auxiliary vertices>
//! --- vertex types end ---
//! ```
//!
//! Sections may appear in any order. All other lines are ignored.
use std::io::{self, Read};

use anyhow::Error;

use crate::{parse_number, write_cost, ParserError};

const MAPPING_BEGIN: &str = "Non-Boolean Variable Mapping BEGINS";
const MAPPING_END: &str = "Non-Boolean Variable Mapping ENDS";
const TYPES_BEGIN: &str = "vertex types begin";
const TYPES_END: &str = "vertex types end";

/// Weighted graph and variable mapping produced by the reduction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReducedGraph {
    /// Vertex ids with the cost of including them in the cover.
    pub vertices: Vec<(usize, f64)>,
    /// Undirected edges between vertex ids.
    pub edges: Vec<(usize, usize)>,
    /// For each original variable id, the boolean node ids encoding it.
    pub variable_nodes: Vec<(usize, Vec<usize>)>,
    /// For each vertex id, the boolean node it represents or `None` for auxiliary vertices.
    pub vertex_types: Vec<(usize, Option<usize>)>,
}

#[derive(Copy, Clone, PartialEq)]
enum Section {
    Other,
    Graph,
    Mapping,
    Types,
}

/// Parser for the output of the reduction tool.
#[derive(Default)]
pub struct CcgParser {
    graph: ReducedGraph,
    header: Option<(usize, usize)>,
    section: Option<Section>,
}

impl CcgParser {
    /// Parse complete output.
    pub fn parse(mut input: impl Read) -> Result<ReducedGraph, Error> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        Ok(CcgParser::parse_str(&text)?)
    }

    /// Parse output held in memory.
    pub fn parse_str(text: &str) -> Result<ReducedGraph, ParserError> {
        let mut parser = CcgParser::default();
        for (index, line) in text.lines().enumerate() {
            parser.parse_line(index + 1, line)?;
        }
        parser.finish()
    }

    fn parse_line(&mut self, line: usize, content: &str) -> Result<(), ParserError> {
        let section = self.section.unwrap_or(Section::Other);

        match section {
            Section::Mapping if content.contains(MAPPING_END) => {
                self.section = None;
                return Ok(());
            }
            Section::Types if content.contains(TYPES_END) => {
                self.section = None;
                return Ok(());
            }
            _ => (),
        }

        if section != Section::Mapping && section != Section::Types {
            if content.contains(MAPPING_BEGIN) {
                self.section = Some(Section::Mapping);
                return Ok(());
            }
            if content.contains(TYPES_BEGIN) {
                self.section = Some(Section::Types);
                return Ok(());
            }
        }

        let tokens: Vec<&str> = content.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(());
        }

        let unexpected = || ParserError::UnexpectedLine {
            line,
            content: content.to_owned(),
        };

        match section {
            Section::Mapping => {
                let variable = parse_number(line, tokens[0])?;
                let nodes = tokens[1..]
                    .iter()
                    .map(|token| parse_number(line, token))
                    .collect::<Result<Vec<usize>, _>>()?;
                self.graph.variable_nodes.push((variable, nodes));
            }
            Section::Types => {
                if tokens.len() != 2 {
                    return Err(unexpected());
                }
                let vertex = parse_number(line, tokens[0])?;
                let node: i64 = parse_number(line, tokens[1])?;
                let node = if node >= 0 { Some(node as usize) } else { None };
                self.graph.vertex_types.push((vertex, node));
            }
            Section::Graph | Section::Other => match tokens[0] {
                "p" if tokens.get(1) == Some(&"edges") => {
                    if self.header.is_some() || tokens.len() != 4 {
                        return Err(ParserError::InvalidHeader {
                            line,
                            header: content.to_owned(),
                        });
                    }
                    let invalid = || ParserError::InvalidHeader {
                        line,
                        header: content.to_owned(),
                    };
                    let vertex_count = tokens[2].parse().map_err(|_| invalid())?;
                    let edge_count = tokens[3].parse().map_err(|_| invalid())?;
                    self.header = Some((vertex_count, edge_count));
                    self.section = Some(Section::Graph);
                }
                "v" if section == Section::Graph => {
                    if tokens.len() != 3 {
                        return Err(unexpected());
                    }
                    let vertex = parse_number(line, tokens[1])?;
                    let weight = parse_number(line, tokens[2])?;
                    self.graph.vertices.push((vertex, weight));
                }
                "e" if section == Section::Graph => {
                    if tokens.len() != 3 {
                        return Err(unexpected());
                    }
                    let a = parse_number(line, tokens[1])?;
                    let b = parse_number(line, tokens[2])?;
                    self.graph.edges.push((a, b));
                }
                _ => (),
            },
        }

        Ok(())
    }

    fn finish(self) -> Result<ReducedGraph, ParserError> {
        match self.section {
            Some(Section::Mapping) => {
                return Err(ParserError::UnterminatedSection {
                    section: MAPPING_BEGIN,
                })
            }
            Some(Section::Types) => {
                return Err(ParserError::UnterminatedSection {
                    section: TYPES_BEGIN,
                })
            }
            _ => (),
        }

        let (vertex_count, edge_count) = match self.header {
            Some(header) => header,
            None => return Err(ParserError::MissingHeader),
        };

        if self.graph.vertices.len() != vertex_count {
            return Err(ParserError::Count {
                what: "vertices",
                count: self.graph.vertices.len(),
                header_count: vertex_count,
            });
        }
        if self.graph.edges.len() != edge_count {
            return Err(ParserError::Count {
                what: "edges",
                count: self.graph.edges.len(),
                header_count: edge_count,
            });
        }

        Ok(self.graph)
    }
}

/// Write a reduced graph in the layout printed by the reduction tool.
pub fn write_ccg(target: &mut impl io::Write, graph: &ReducedGraph) -> io::Result<()> {
    writeln!(target, "--- {} ---", MAPPING_BEGIN)?;
    for (variable, nodes) in graph.variable_nodes.iter() {
        itoa::write(&mut *target, *variable)?;
        target.write_all(b"\t")?;
        for &node in nodes.iter() {
            itoa::write(&mut *target, node)?;
            target.write_all(b" ")?;
        }
        target.write_all(b"\n")?;
    }
    writeln!(target, "--- {} ---", MAPPING_END)?;

    writeln!(
        target,
        "p edges {} {}",
        graph.vertices.len(),
        graph.edges.len()
    )?;
    for &(vertex, weight) in graph.vertices.iter() {
        target.write_all(b"v ")?;
        itoa::write(&mut *target, vertex)?;
        target.write_all(b" ")?;
        write_cost(&mut *target, weight)?;
        target.write_all(b"\n")?;
    }
    for &(a, b) in graph.edges.iter() {
        target.write_all(b"e ")?;
        itoa::write(&mut *target, a)?;
        target.write_all(b" ")?;
        itoa::write(&mut *target, b)?;
        target.write_all(b"\n")?;
    }

    writeln!(target, "--- {} ---", TYPES_BEGIN)?;
    for &(vertex, node) in graph.vertex_types.iter() {
        itoa::write(&mut *target, vertex)?;
        target.write_all(b" ")?;
        match node {
            Some(node) => itoa::write(&mut *target, node)?,
            None => itoa::write(&mut *target, -1)?,
        };
        target.write_all(b"\n")?;
    }
    writeln!(target, "--- {} ---", TYPES_END)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
c some log output
--- Non-Boolean Variable Mapping BEGINS ---
0\t0
1\t1 2
--- Non-Boolean Variable Mapping ENDS ---
p edges 4 3
v 1 2
v 2 0.5
v 3 1
v 4 0
e 1 2
e 2 4
e 3 4
--- vertex types begin ---
1 0
2 1
3 2
4 -1
--- vertex types end ---
";

    #[test]
    fn parse_output() -> Result<(), Error> {
        let graph = CcgParser::parse(OUTPUT.as_bytes())?;

        assert_eq!(graph.vertices, vec![(1, 2.0), (2, 0.5), (3, 1.0), (4, 0.0)]);
        assert_eq!(graph.edges, vec![(1, 2), (2, 4), (3, 4)]);
        assert_eq!(graph.variable_nodes, vec![(0, vec![0]), (1, vec![1, 2])]);
        assert_eq!(
            graph.vertex_types,
            vec![(1, Some(0)), (2, Some(1)), (3, Some(2)), (4, None)]
        );

        let mut buf = vec![];
        write_ccg(&mut buf, &graph)?;
        assert_eq!(CcgParser::parse(&buf[..])?, graph);

        Ok(())
    }

    macro_rules! expect_error {
        ( $input:expr, $( $cases:tt )* ) => {
            match CcgParser::parse_str($input) {
                Ok(parsed) => panic!("Expected error but got {:?}", parsed),
                Err(err) => match err {
                    $( $cases )*,
                    _ => panic!("Unexpected error {:?}", err),
                }
            }
        };
    }

    #[test]
    fn invalid_outputs() {
        expect_error!("v 1 2\n", ParserError::MissingHeader => ());
        expect_error!("p edges 1\n", ParserError::InvalidHeader { line: 1, .. } => ());
        expect_error!("p edges 1 0\np edges 1 0\n", ParserError::InvalidHeader { line: 2, .. } => ());
        expect_error!("p edges 1 0\nv 1\n", ParserError::UnexpectedLine { line: 2, .. } => ());
        expect_error!("p edges 1 0\nv 1 x\n", ParserError::InvalidNumber { line: 2, .. } => ());
        expect_error!(
            "p edges 2 0\nv 1 1\n",
            ParserError::Count { what: "vertices", count: 1, header_count: 2 } => ()
        );
        expect_error!(
            "p edges 1 1\nv 1 1\n",
            ParserError::Count { what: "edges", count: 0, header_count: 1 } => ()
        );
        expect_error!(
            "p edges 0 0\n--- vertex types begin ---\n",
            ParserError::UnterminatedSection { .. } => ()
        );
        expect_error!(
            "--- vertex types begin ---\n1 2 3\n",
            ParserError::UnexpectedLine { line: 2, .. } => ()
        );
    }
}
