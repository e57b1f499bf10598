//! Per round solver statistics.
use std::io;
use std::time::Duration;

use serde::Serialize;

use dcop_instance::Cost;

/// Statistics recorded after a round.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IterationStats {
    /// Name of the algorithm that performed the round.
    pub algorithm: &'static str,
    /// Number of completed rounds.
    pub iteration: u64,
    /// Number of messages sent since the last reset.
    pub messages: u64,
    /// Time spent solving since the last reset.
    pub elapsed: Duration,
    /// Cost of the assignment, `None` while some variable is unassigned.
    pub cost: Option<Cost>,
}

/// Series of per round statistics owned by a solver.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    records: Vec<IterationStats>,
}

impl Stats {
    pub fn record(&mut self, stats: IterationStats) {
        debug_assert!(self.records.last().map_or(true, |last| {
            last.iteration <= stats.iteration && last.messages <= stats.messages
        }));
        self.records.push(stats);
    }

    /// All records in the order they were recorded.
    pub fn records(&self) -> &[IterationStats] {
        &self.records
    }

    pub fn last(&self) -> Option<&IterationStats> {
        self.records.last()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Write all records as a tab separated table.
    pub fn write_summary(&self, target: &mut impl io::Write) -> io::Result<()> {
        writeln!(target, "iter\tmsgs\ttime\tcost")?;
        for record in self.records.iter() {
            write!(
                target,
                "{}\t{}\t{:.3}\t",
                record.iteration,
                record.messages,
                record.elapsed.as_secs_f64()
            )?;
            match record.cost {
                Some(cost) => writeln!(target, "{}", cost)?,
                None => writeln!(target, "-")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_table() -> Result<(), anyhow::Error> {
        let mut stats = Stats::default();
        stats.record(IterationStats {
            algorithm: "maxsum",
            iteration: 0,
            messages: 0,
            elapsed: Duration::from_millis(0),
            cost: None,
        });
        stats.record(IterationStats {
            algorithm: "maxsum",
            iteration: 1,
            messages: 4,
            elapsed: Duration::from_millis(1500),
            cost: Some(2.5),
        });

        let mut buf = vec![];
        stats.write_summary(&mut buf)?;
        assert_eq!(
            String::from_utf8(buf)?,
            "iter\tmsgs\ttime\tcost\n0\t0\t0.000\t-\n1\t4\t1.500\t2.5\n"
        );

        stats.clear();
        assert!(stats.last().is_none());

        Ok(())
    }
}
