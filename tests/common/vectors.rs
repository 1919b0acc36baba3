#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Scale `v` to unit length.
pub fn unit(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

/// Generate `n` random unit vectors of dimension `dims`.
pub fn random_unit_vectors(n: usize, dims: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let v: Vec<f32> = (0..dims).map(|_| rng.gen_range(-1.0..1.0)).collect();
            unit(&v)
        })
        .collect()
}

/// Deterministic unit vector derived from a string key.
pub fn keyed_vector(key: &str, dims: usize) -> Vec<f32> {
    // FNV-1a, enough to spread keys across seeds
    let seed = key
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    random_unit_vectors(1, dims, seed).remove(0)
}

/// Reference top-k by exhaustive scoring, ties by ordinal.
pub fn brute_force_top_k(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let d = v
                .iter()
                .zip(query)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>();
            (i, d)
        })
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_unit_vectors() {
        let vecs = random_unit_vectors(10, 16, 42);
        assert_eq!(vecs.len(), 10);
        for v in &vecs {
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_keyed_vector_is_stable() {
        assert_eq!(keyed_vector("dog", 8), keyed_vector("dog", 8));
        assert_ne!(keyed_vector("dog", 8), keyed_vector("cat", 8));
    }
}
