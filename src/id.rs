use uuid::Uuid;

use crate::base62;

/// Time-ordered record id: a UUIDv7 rendered as 22 Base62 characters.
pub fn new_id() -> String {
    let uuid = Uuid::now_v7();
    base62::fit(&base62::encode_bytes(uuid.as_bytes()), 22)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_length() {
        let id = new_id();
        assert_eq!(id.len(), 22);
    }

    #[test]
    fn test_new_id_uniqueness() {
        let id1 = new_id();
        let id2 = new_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_id_chars() {
        let id = new_id();
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
