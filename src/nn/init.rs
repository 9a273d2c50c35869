//! Weight initialization.
//!
//! # References
//!
//! - He, K., et al. (2015). Delving deep into rectifiers: Surpassing human-level
//!   performance on `ImageNet` classification. ICCV.

use rand::rngs::StdRng;
use rand::Rng;

use crate::primitives::Matrix;

/// Kaiming uniform initialization (He et al., 2015) for a
/// `fan_out × fan_in` weight matrix.
///
/// Samples from U(-bound, bound) where bound = sqrt(6 / `fan_in`).
#[must_use]
pub fn kaiming_uniform(fan_in: usize, fan_out: usize, rng: &mut StdRng) -> Matrix<f32> {
    let bound = (6.0 / fan_in.max(1) as f32).sqrt();
    let mut weight = Matrix::zeros(fan_out, fan_in);
    for w in weight.as_mut_slice() {
        *w = rng.gen_range(-bound..=bound);
    }
    weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_kaiming_uniform_bounds_and_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let w = kaiming_uniform(24, 5, &mut rng);
        assert_eq!(w.shape(), (5, 24));
        let bound = 0.5_f32;
        assert!(w.as_slice().iter().all(|v| v.abs() <= bound + 1e-6));
        assert!(w.as_slice().iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_kaiming_uniform_seeded() {
        let a = kaiming_uniform(3, 3, &mut StdRng::seed_from_u64(1));
        let b = kaiming_uniform(3, 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
