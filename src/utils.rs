// RaffleStack Program - Utility Functions

/// Reduce a big-endian 256-bit word modulo `modulus`
pub fn word_mod(word: &[u8; 32], modulus: u64) -> Option<u64> {
    if modulus == 0 {
        return None;
    }

    let modulus = modulus as u128;
    let remainder = word
        .iter()
        .fold(0u128, |acc, byte| ((acc << 8) | *byte as u128) % modulus);
    Some(remainder as u64)
}

/// Big-endian word holding `value`
pub fn word_from_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}

