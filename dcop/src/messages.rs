//! Post-processing shared by all message passing algorithms.
use crate::rng::SolverRng;

/// Subtract the minimum entry so the smallest entry becomes zero.
pub fn normalize(message: &mut [f64]) {
    let min = message.iter().cloned().fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        for entry in message.iter_mut() {
            *entry -= min;
        }
    }
}

/// Add independent zero-mean Gaussian noise to every entry.
pub fn perturb(message: &mut [f64], scale: f64, rng: &mut SolverRng) {
    if scale == 0.0 {
        return;
    }
    for entry in message.iter_mut() {
        *entry += rng.noise(scale);
    }
}

/// Blend a new message with the previously sent one.
///
/// Computes `damping * previous + (1 - damping) * message`; a damping of zero keeps the message.
pub fn damp(message: &mut [f64], previous: &[f64], damping: f64) {
    if damping <= 0.0 {
        return;
    }
    debug_assert_eq!(message.len(), previous.len());
    for (entry, &previous) in message.iter_mut().zip(previous) {
        *entry = damping * previous + (1.0 - damping) * *entry;
    }
}

/// Position of the smallest entry, the lowest position on ties.
pub fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (index, &value) in values.iter().enumerate() {
        if value < values[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_and_damp() {
        let mut message = [3.0, 1.5, 4.0];
        normalize(&mut message);
        assert_eq!(message, [1.5, 0.0, 2.5]);

        damp(&mut message, &[0.5, 0.5, 0.5], 0.5);
        assert_eq!(message, [1.0, 0.25, 1.5]);

        let mut unchanged = [1.0, 2.0];
        damp(&mut unchanged, &[7.0, 7.0], 0.0);
        perturb(&mut unchanged, 0.0, &mut SolverRng::new(1));
        assert_eq!(unchanged, [1.0, 2.0]);

        let mut empty: [f64; 0] = [];
        normalize(&mut empty);
        assert_eq!(argmin(&empty), 0);
        assert_eq!(argmin(&[2.0, 1.0, 3.0, 1.0]), 1);
    }
}
