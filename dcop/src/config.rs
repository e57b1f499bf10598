//! Solver configuration.
use serde::{Deserialize, Serialize};

use dcop_internal_macros::{ConfigUpdate, DocDefault};

/// Decision rule of the DSA local search when switching does not strictly improve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DsaVariant {
    /// Only switch on strict improvement.
    A,
    /// Also switch on ties while involved in a violated constraint.
    B,
    /// Also switch on ties.
    C,
}

/// Configurable parameters used during solving.
#[derive(DocDefault, ConfigUpdate, Clone, Debug)]
pub struct SolverConfig {
    /// Number of rounds performed by `Solver::run`. (Default: 100)
    pub iteration_limit: u64,

    /// Weight of the previously sent message when damping Max-Sum messages. (Default: 0.7)
    ///
    /// Zero disables damping. (Range: 0.0..1.0)
    pub damping: f64,

    /// Standard deviation of the Gaussian noise added to Max-Sum messages. (Default: 0.01)
    ///
    /// Zero disables noise. (Range: 0.0..)
    pub noise_scale: f64,

    /// Decision rule used by DSA, one of "A", "B" or "C". (Default: DsaVariant::C)
    pub dsa_variant: DsaVariant,

    /// Probability of DSA taking an eligible move. (Default: 0.7)
    ///
    /// (Range: 0.0..=1.0)
    pub dsa_probability: f64,

    /// Seed of the pseudo random number generator. (Default: 1234)
    pub seed: u64,

    /// Cost written for forbidden tuples when exporting for the graph reduction. (Default: 9999999)
    pub big_m: u64,

    /// Executable performing the graph reduction. (Default: "wcsp".to_owned())
    pub ccg_oracle: String,

    /// Arguments passed to the reduction executable before the input path.
    /// (Default: vec!["-k".to_owned(), "-g".to_owned()])
    pub ccg_oracle_args: Vec<String>,
}

impl SolverConfig {
    /// Apply a partial update.
    pub fn update(&mut self, update: &SolverConfigUpdate) -> Result<(), anyhow::Error> {
        update.apply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_docs() {
        let config = SolverConfig::default();
        assert_eq!(config.iteration_limit, 100);
        assert_eq!(config.damping, 0.7);
        assert_eq!(config.dsa_variant, DsaVariant::C);
        assert_eq!(config.ccg_oracle, "wcsp");
        assert_eq!(config.ccg_oracle_args, vec!["-k", "-g"]);
    }

    #[test]
    fn toml_updates() -> Result<(), anyhow::Error> {
        let mut update = SolverConfigUpdate::new();
        update.merge(toml::from_str("damping = 0.25\ndsa_variant = \"A\"")?);
        update.merge(toml::from_str("seed = 7")?);

        let mut config = SolverConfig::default();
        config.update(&update)?;

        assert_eq!(config.damping, 0.25);
        assert_eq!(config.dsa_variant, DsaVariant::A);
        assert_eq!(config.seed, 7);
        assert_eq!(config.iteration_limit, 100);

        Ok(())
    }

    #[test]
    fn range_checks() -> Result<(), anyhow::Error> {
        let mut config = SolverConfig::default();

        let update: SolverConfigUpdate = toml::from_str("damping = 1.0")?;
        assert!(config.update(&update).is_err());

        let update: SolverConfigUpdate = toml::from_str("noise_scale = -0.5")?;
        assert!(config.update(&update).is_err());

        let update: SolverConfigUpdate = toml::from_str("dsa_probability = 1.0\nseed = 3")?;
        config.update(&update)?;
        assert_eq!(config.dsa_probability, 1.0);

        assert!(toml::from_str::<SolverConfigUpdate>("no_such_option = 1").is_err());
        assert!(SolverConfig::help().contains("dsa_probability"));

        Ok(())
    }
}
