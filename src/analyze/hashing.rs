//! FNV-1a, SimHash and MinHash primitives for near-duplicate detection.

pub const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
pub const FNV_PRIME: u32 = 0x0100_0193;

/// Slots in a MinHash signature.
pub const MINHASH_SLOTS: usize = 64;
/// Character n-gram size for MinHash shingles.
pub const SHINGLE_SIZE: usize = 3;
const MINHASH_SEED: u32 = 0x9e37_79b9;

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// 32-bit SimHash over tokens; `None` when there are no tokens.
pub fn simhash32<S: AsRef<str>>(tokens: &[S]) -> Option<u32> {
    if tokens.is_empty() {
        return None;
    }
    let mut votes = [0i64; 32];
    for token in tokens {
        let h = fnv1a32(token.as_ref().as_bytes());
        for (bit, vote) in votes.iter_mut().enumerate() {
            if (h >> bit) & 1 == 1 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }
    Some(
        votes
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0)
            .fold(0u32, |acc, (bit, _)| acc | (1 << bit)),
    )
}

/// `1 − hamming/32`.
pub fn simhash_similarity(a: u32, b: u32) -> f64 {
    1.0 - f64::from((a ^ b).count_ones()) / 32.0
}

/// Marsaglia xorshift32. Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        // zero is a fixed point of the generator
        Self {
            state: if seed == 0 { MINHASH_SEED } else { seed },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

/// Whitespace-free character n-grams. Texts shorter than `n` become one shingle.
pub fn char_shingles(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() < n || n == 0 {
        return vec![chars.into_iter().collect()];
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// MinHash over character shingles with `h_i(x) = (a_i*x + b_i) mod 2^32`.
///
/// Parameters are drawn once from a fixed-seed xorshift32 stream, so signatures are
/// comparable across calls and processes.
#[derive(Debug, Clone)]
pub struct MinHasher {
    params: Vec<(u32, u32)>,
}

impl Default for MinHasher {
    fn default() -> Self {
        Self::new(MINHASH_SLOTS, MINHASH_SEED)
    }
}

impl MinHasher {
    pub fn new(slots: usize, seed: u32) -> Self {
        let mut rng = XorShift32::new(seed);
        let params = (0..slots.max(1))
            .map(|_| (rng.next_u32() | 1, rng.next_u32()))
            .collect();
        Self { params }
    }

    pub fn slots(&self) -> usize {
        self.params.len()
    }

    /// Signature of `text`; `None` when it has no non-whitespace characters.
    pub fn signature(&self, text: &str) -> Option<Vec<u32>> {
        let shingles: Vec<u32> = char_shingles(text, SHINGLE_SIZE)
            .iter()
            .map(|s| fnv1a32(s.as_bytes()))
            .collect();
        if shingles.is_empty() {
            return None;
        }
        Some(
            self.params
                .iter()
                .map(|&(a, b)| {
                    shingles
                        .iter()
                        .map(|&x| {
                            ((u64::from(a) * u64::from(x) + u64::from(b)) & 0xffff_ffff) as u32
                        })
                        .min()
                        .unwrap_or(u32::MAX)
                })
                .collect(),
        )
    }

    /// Fraction of matching slots.
    pub fn similarity(a: &[u32], b: &[u32]) -> f64 {
        let n = a.len().min(b.len());
        if n == 0 {
            return 0.0;
        }
        let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
        same as f64 / n as f64
    }
}
