//! Enumeration of joint assignments.
use smallvec::SmallVec;

/// Mixed radix counter enumerating all tuples of domain positions.
///
/// Tuples are produced in lexicographic order with the last position varying fastest, which is
/// the order of a Cartesian product of the domains. Each tuple is produced in place, so
/// enumerating a product never materializes it.
#[derive(Clone, Debug)]
pub struct Odometer {
    radices: SmallVec<[usize; 4]>,
    digits: SmallVec<[usize; 4]>,
    started: bool,
    exhausted: bool,
}

impl Odometer {
    /// Create an odometer for the given domain sizes.
    pub fn new(radices: impl IntoIterator<Item = usize>) -> Odometer {
        let radices: SmallVec<[usize; 4]> = radices.into_iter().collect();
        let digits = radices.iter().map(|_| 0).collect();
        Odometer {
            radices,
            digits,
            started: false,
            exhausted: false,
        }
    }

    /// Number of tuples this odometer enumerates in total.
    pub fn tuple_count(&self) -> usize {
        self.radices.iter().product()
    }

    /// Move to the next tuple and return it.
    ///
    /// The first call returns the all-zero tuple. Returns `None` once all tuples were produced.
    pub fn advance(&mut self) -> Option<&[usize]> {
        if self.exhausted {
            return None;
        }

        if !self.started {
            self.started = true;
            if self.radices.iter().any(|&radix| radix == 0) {
                self.exhausted = true;
                return None;
            }
            return Some(&self.digits[..]);
        }

        for position in (0..self.digits.len()).rev() {
            self.digits[position] += 1;
            if self.digits[position] < self.radices[position] {
                return Some(&self.digits[..]);
            }
            self.digits[position] = 0;
        }

        self.exhausted = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(radices: &[usize]) -> Vec<Vec<usize>> {
        let mut odometer = Odometer::new(radices.iter().cloned());
        let mut tuples = vec![];
        while let Some(tuple) = odometer.advance() {
            tuples.push(tuple.to_vec());
        }
        tuples
    }

    #[test]
    fn product_order() {
        assert_eq!(
            collect(&[2, 3]),
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn degenerate_products() {
        assert_eq!(collect(&[]), vec![Vec::<usize>::new()]);
        assert!(collect(&[3, 0, 2]).is_empty());
        assert_eq!(Odometer::new(vec![2, 2, 3]).tuple_count(), 12);
    }
}
