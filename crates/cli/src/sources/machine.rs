//! Anonymous device ID sent alongside receipt validations

use sha2::{Digest, Sha256};

/// Returns a stable anonymous device identifier (first 16 hex chars of SHA-256).
///
/// Input: username + hostname. Falls back to the config dir path if both are
/// unavailable. Only the hash leaves the machine.
pub fn device_id() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default();

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default();

    let seed = if !user.is_empty() || !host.is_empty() {
        format!("{}@{}", user, host)
    } else {
        dirs::config_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "subwatch-unknown".to_string())
    };

    hex_digest(&seed)
}

fn hex_digest(seed: &str) -> String {
    Sha256::digest(seed.as_bytes())[..8]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_is_stable() {
        assert_eq!(device_id(), device_id());
    }

    #[test]
    fn device_id_is_16_hex_chars() {
        let id = device_id();
        assert_eq!(id.len(), 16, "Expected 16 hex chars, got: {id}");
        assert!(
            id.chars().all(|c| c.is_ascii_hexdigit()),
            "Non-hex char in: {id}"
        );
    }

    #[test]
    fn different_seeds_give_different_ids() {
        assert_ne!(hex_digest("alice@laptop"), hex_digest("bob@laptop"));
    }

    #[test]
    fn digest_of_known_seed() {
        // sha256("") = e3b0c44298fc1c14...
        assert_eq!(hex_digest(""), "e3b0c44298fc1c14");
    }
}
