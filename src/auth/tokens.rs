use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Opaque, URL-safe token for sessions, email verification and password
/// reset. Carries no embedded meaning; only ever validated by store lookup.
pub fn issue_opaque() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe() {
        let token = issue_opaque();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_carry_full_entropy() {
        // 32 bytes, unpadded url-safe base64
        assert_eq!(issue_opaque().len(), 43);
    }

    #[test]
    fn tokens_are_distinct() {
        assert_ne!(issue_opaque(), issue_opaque());
    }
}
