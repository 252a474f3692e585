//! Random sequence generation, mainly for benchmarks and test data.

use rand::Rng;

/// Draws `length` symbols from `symbols`, either uniformly or with the given
/// per-symbol probabilities. `probabilities` must parallel `symbols` and sum
/// to 1; entries after the first whose cumulative sum reaches 1 are never
/// drawn.
pub fn generate_sequence<R: Rng + ?Sized>(
    rng: &mut R,
    symbols: &[u8],
    probabilities: Option<&[f64]>,
    length: usize,
) -> Vec<u8> {
    let n = symbols.len();
    assert!(n > 0, "alphabet must not be empty");

    let cumulative: Vec<f64> = match probabilities {
        None => (0..n).map(|i| i as f64 / n as f64).collect(),
        Some(p) => {
            assert_eq!(p.len(), n, "one probability per symbol");
            let mut sum = 0.0;
            p.iter()
                .map(|&x| {
                    let before = sum;
                    sum += x;
                    before
                })
                .collect()
        }
    };

    let mut out = Vec::with_capacity(length);
    for _ in 0..length {
        let r = rng.gen::<f64>();
        let mut i = n - 1;
        while i > 0 && r < cumulative[i] {
            i -= 1;
        }
        out.push(symbols[i]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn draws_only_from_the_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let seq = generate_sequence(&mut rng, b"ACGT", None, 10_000);
        assert_eq!(seq.len(), 10_000);
        assert!(seq.iter().all(|c| b"ACGT".contains(c)));
        // Uniform draws hit every symbol at this length.
        for c in b"ACGT" {
            assert!(seq.contains(c));
        }
    }

    #[test]
    fn respects_skewed_probabilities() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let seq = generate_sequence(&mut rng, b"AC", Some(&[0.95, 0.05]), 20_000);
        let a = seq.iter().filter(|&&c| c == b'A').count();
        assert!(a > 18_000 && a < 19_800, "got {a} out of 20000");
    }

    #[test]
    fn zero_probability_symbols_never_appear() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let seq = generate_sequence(&mut rng, b"ACG", Some(&[0.5, 0.5, 0.0]), 5_000);
        assert!(!seq.contains(&b'G'));
    }

    #[test]
    fn deterministic_for_a_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(4);
        let mut b = ChaCha8Rng::seed_from_u64(4);
        assert_eq!(
            generate_sequence(&mut a, b"ACGT", None, 256),
            generate_sequence(&mut b, b"ACGT", None, 256)
        );
    }
}
