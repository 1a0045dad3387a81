pub fn u8s_from_str(input: &str) -> [u8; 32] {
    blake3::hash(input.as_bytes()).into()
}

/// Derives an independent 32 byte seed for one consumer (a chain, the data
/// sampler, ...) from the user supplied seed string.
pub fn seed_for(seed: &str, label: &str) -> [u8; 32] {
    u8s_from_str(format!("{}:{}", seed, label).as_str())
}
