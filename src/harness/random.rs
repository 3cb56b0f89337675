//! Deterministic fixture content

/// Pseudo-random bytes derived from `seed`
///
/// Uses the BLAKE3 extendable output, so the same seed and length always
/// give the same bytes, and a longer request extends a shorter one.
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"blobkit fixture");
    hasher.update(&seed.to_le_bytes());

    let mut buf = vec![0u8; len];
    hasher.finalize_xof().fill(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_bytes() {
        assert_eq!(random_bytes(23, 4096), random_bytes(23, 4096));
        assert_ne!(random_bytes(23, 4096), random_bytes(24, 4096));
    }

    #[test]
    fn test_prefix_stable() {
        let long = random_bytes(7, 10_000);
        let short = random_bytes(7, 1_000);
        assert_eq!(&long[..1_000], short.as_slice());
    }

    #[test]
    fn test_not_constant() {
        let data = random_bytes(1, 1024);
        assert!(data.iter().any(|&b| b != data[0]));
        assert!(random_bytes(1, 0).is_empty());
    }
}
