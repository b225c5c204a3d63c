//! Opaque identifier generation.
//!
//! Match ids and access tokens are both "random-looking opaque strings" as
//! far as the rest of the system is concerned; both are minted here.

use uuid::Uuid;

/// A fresh v4 UUID rendered as a hyphenated string.
pub fn new_guid() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guids_are_unique() {
        let a = new_guid();
        let b = new_guid();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
