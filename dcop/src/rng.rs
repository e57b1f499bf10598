//! Seeded pseudo random number generation.
use rand::{rngs::StdRng, Error, Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;

/// The single random stream of a solver.
///
/// All agents draw from this stream in their deterministic processing order, so runs are
/// reproducible for a given seed.
pub struct SolverRng {
    rng: StdRng,
}

impl Default for SolverRng {
    fn default() -> SolverRng {
        SolverRng::new(0)
    }
}

impl SolverRng {
    pub fn new(seed: u64) -> SolverRng {
        SolverRng {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Restart the stream from a new seed.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Zero-mean Gaussian noise with the given standard deviation.
    ///
    /// Does not consume randomness when `scale` is zero.
    pub fn noise(&mut self, scale: f64) -> f64 {
        if scale == 0.0 {
            0.0
        } else {
            let sample: f64 = self.rng.sample(StandardNormal);
            scale * sample
        }
    }
}

impl RngCore for SolverRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.rng.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reseed_restarts_stream() {
        let mut rng = SolverRng::new(5);
        let first: Vec<u32> = (0..4).map(|_| rng.gen_range(0, 1000)).collect();
        rng.reseed(5);
        let second: Vec<u32> = (0..4).map(|_| rng.gen_range(0, 1000)).collect();
        assert_eq!(first, second);

        assert_eq!(rng.noise(0.0), 0.0);
        let noise: Vec<f64> = (0..1000).map(|_| rng.noise(0.5)).collect();
        let mean = noise.iter().sum::<f64>() / 1000.0;
        assert!(mean.abs() < 0.1);
    }
}
