use rand::Rng;

pub const INVITE_CODE_LEN: usize = 8;

/// Lowercase letters and digits without the easily confused 0/o, 1/l/i.
const ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

/// Random, URL-safe token. Uniqueness is enforced by the store.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
