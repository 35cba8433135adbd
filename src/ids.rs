//! Player and session id generation.

use rand::Rng;

/// Characters allowed in session ids; no `0` to avoid confusion with `O`.
pub const SESSION_ID_ALPHABET: &[u8] = b"123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a session id.
pub const SESSION_ID_LEN: usize = 6;

/// Generates a short, human-typeable session id.
pub fn new_session_id(rng: &mut impl Rng) -> String {
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect()
}

/// Generates an opaque 128-bit player id as lowercase hex.
pub fn new_player_id(rng: &mut impl Rng) -> String {
    format!("{:032x}", rng.r#gen::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_session_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let id = new_session_id(&mut rng);
            assert_eq!(id.len(), SESSION_ID_LEN);
            assert!(id.bytes().all(|b| SESSION_ID_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_player_ids_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = new_player_id(&mut rng);
        let b = new_player_id(&mut rng);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
