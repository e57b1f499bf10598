//! Reduction of an instance to its constraint composite graph.
use std::io::{self, Write};
use std::process::{Command, ExitStatus};
use std::string::FromUtf8Error;

use log::info;
use thiserror::Error;

use dcop_instance::Instance;
use dcop_wcsp::{write_wcsp, CcgParser, ParserError};

use crate::config::SolverConfig;

use super::graph::CcgGraph;

/// Failure to obtain a valid constraint composite graph.
#[derive(Debug, Error)]
pub enum ReductionError {
    #[error("failed to pass the instance to the reduction: {}", source)]
    Io {
        #[from]
        source: io::Error,
    },
    #[error("failed to run '{}': {}", program, source)]
    Spawn { program: String, source: io::Error },
    #[error("reduction failed with {}: {}", status, stderr)]
    Status { status: ExitStatus, stderr: String },
    #[error("reduction output is not valid UTF-8: {}", source)]
    Utf8 {
        #[from]
        source: FromUtf8Error,
    },
    #[error("invalid reduction output: {}", source)]
    Parse {
        #[from]
        source: ParserError,
    },
    #[error("reduction output references unknown vertex {}", vertex)]
    UnknownVertex { vertex: usize },
    #[error("reduction output lists vertex {} twice", vertex)]
    DuplicateVertex { vertex: usize },
    #[error("vertex {} encodes more than one variable", vertex)]
    SharedVertex { vertex: usize },
    #[error("reduction output references unknown boolean node {}", node)]
    UnknownNode { node: usize },
    #[error("reduction output references unknown variable {}", variable)]
    UnknownVariable { variable: usize },
    #[error(
        "variable {} is encoded by {} nodes instead of {}",
        variable,
        count,
        expected
    )]
    NodeCount {
        variable: String,
        count: usize,
        expected: usize,
    },
}

/// Computes the constraint composite graph of a serialized instance.
pub trait ReductionOracle {
    /// Reduce the textual instance and return the printed graph.
    fn reduce(&self, wcsp: &[u8]) -> Result<String, ReductionError>;
}

/// Runs an external executable on a temporary file holding the instance.
#[derive(Clone, Debug)]
pub struct ExternalOracle {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalOracle {
    pub fn from_config(config: &SolverConfig) -> ExternalOracle {
        ExternalOracle {
            program: config.ccg_oracle.clone(),
            args: config.ccg_oracle_args.clone(),
        }
    }
}

impl ReductionOracle for ExternalOracle {
    fn reduce(&self, wcsp: &[u8]) -> Result<String, ReductionError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(wcsp)?;
        file.flush()?;

        info!(
            "Running {} {} {}",
            self.program,
            self.args.join(" "),
            file.path().display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .output()
            .map_err(|source| ReductionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReductionError::Status {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

/// Reduce an instance to its constraint composite graph.
///
/// Variables are identified by their insertion order and values by their domain position.
pub fn reduce(
    instance: &Instance,
    big_m: u64,
    oracle: &dyn ReductionOracle,
) -> Result<CcgGraph, ReductionError> {
    let mut input = vec![];
    write_wcsp(&mut input, instance, big_m)?;

    let output = oracle.reduce(&input)?;
    let reduced = CcgParser::parse_str(&output)?;
    let graph = CcgGraph::from_reduction(instance, &reduced)?;

    info!(
        "Constraint composite graph: {} nodes, {} edges",
        graph.nodes().len(),
        graph.edges().len()
    );

    Ok(graph)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use dcop_instance::InstanceBuilder;

    fn instance() -> Instance {
        let mut builder = InstanceBuilder::new();
        builder
            .agent("a")
            .variable("x", vec![0, 1], "a")
            .table_constraint("u", vec!["x"], vec![0.0, 3.0]);
        builder.build().unwrap()
    }

    fn shell(script: &str) -> ExternalOracle {
        ExternalOracle {
            program: "sh".to_owned(),
            args: vec!["-c".to_owned(), script.to_owned(), "oracle".to_owned()],
        }
    }

    #[test]
    fn external_oracle_output() {
        let oracle = shell(
            "printf 'Non-Boolean Variable Mapping BEGINS\\n0 0\\n\
             Non-Boolean Variable Mapping ENDS\\n\
             p edges 1 0\\nv 1 3\\n\
             vertex types begin\\n1 0\\nvertex types end\\n'",
        );
        let graph = reduce(&instance(), 100, &oracle).unwrap();
        assert_eq!(graph.nodes().len(), 1);
        assert_eq!(graph.nodes()[0].weight, 3.0);
    }

    #[test]
    fn oracle_receives_instance() {
        let oracle = shell("cat \"$1\" >&2; exit 3");
        match reduce(&instance(), 100, &oracle) {
            Err(ReductionError::Status { stderr, .. }) => {
                assert!(stderr.starts_with("edges 1 2 1 100"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oracle_failures() {
        let missing = ExternalOracle {
            program: "/nonexistent/ccg-reduction".to_owned(),
            args: vec![],
        };
        match reduce(&instance(), 100, &missing) {
            Err(ReductionError::Spawn { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }

        match reduce(&instance(), 100, &shell("echo 'p edges x'")) {
            Err(ReductionError::Parse { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }

        match reduce(&instance(), 100, &shell("printf '\\377\\n'")) {
            Err(ReductionError::Utf8 { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
