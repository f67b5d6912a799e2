/// Admin keys are only ever stored as a blake3 hex digest.
pub fn hash_admin_key(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

pub fn verify_admin_key(expected_hash: &str, presented: &str) -> bool {
    let Ok(expected) = blake3::Hash::from_hex(expected_hash.trim()) else {
        return false;
    };
    // `blake3::Hash` equality is constant-time.
    blake3::hash(presented.as_bytes()) == expected
}

pub(crate) fn generate_admin_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_only_matching_key() {
        let hash = hash_admin_key("secret");
        assert!(verify_admin_key(&hash, "secret"));
        assert!(!verify_admin_key(&hash, "Secret"));
        assert!(!verify_admin_key("not-hex", "secret"));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_admin_key(), generate_admin_key());
        assert_eq!(generate_admin_key().len(), 32);
    }
}
