use rand::{distributions::Alphanumeric, Rng};

/// Length of generated device provisioning passwords
pub const DEVICE_PASSWORD_LEN: usize = 32;

/// Generate an opaque identifier for a stored record
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Generate a random alphanumeric provisioning password
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DEVICE_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Normalize MAC address to upper-case hex without separators
/// e.g., "00:15:65:aa:bb:cc" -> "001565AABBCC"
pub fn normalize_mac(mac: &str) -> String {
    let clean: String = mac
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    clean.trim().to_uppercase()
}

/// Validate a normalized MAC address (exactly 12 hex digits)
pub fn is_valid_mac(mac: &str) -> bool {
    regex_lite::Regex::new(r"^[0-9A-Fa-f]{12}$")
        .map(|re| re.is_match(mac))
        .unwrap_or(false)
}

/// Extract the MAC from a phone's config request file name
/// e.g., "001565aabbcc.cfg" -> Some("001565AABBCC")
pub fn mac_from_config_filename(filename: &str) -> Option<String> {
    let mac = filename.strip_suffix(".cfg")?;
    if !is_valid_mac(mac) {
        return None;
    }
    Some(normalize_mac(mac))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("00:15:65:aa:bb:cc"), "001565AABBCC");
        assert_eq!(normalize_mac("00-15-65-AA-BB-CC"), "001565AABBCC");
        assert_eq!(normalize_mac("0015.65aa.bbcc"), "001565AABBCC");
        assert_eq!(normalize_mac("001565aabbcc"), "001565AABBCC");
    }

    #[test]
    fn test_is_valid_mac() {
        assert!(is_valid_mac("001565AABBCC"));
        assert!(is_valid_mac("001565aabbcc"));
        assert!(!is_valid_mac(""));
        assert!(!is_valid_mac("001565AABBC"));
        assert!(!is_valid_mac("001565AABBCCD"));
        assert!(!is_valid_mac("001565AABBCG"));
        assert!(!is_valid_mac("00:15:65:aa:bb:cc"));
    }

    #[test]
    fn test_mac_from_config_filename() {
        assert_eq!(
            mac_from_config_filename("001565aabbcc.cfg").as_deref(),
            Some("001565AABBCC")
        );
        assert_eq!(mac_from_config_filename("001565aabbcc"), None);
        assert_eq!(mac_from_config_filename("001565aabbcc.txt"), None);
        assert_eq!(mac_from_config_filename("y000000000108.cfg"), None);
        assert_eq!(mac_from_config_filename("../etc/passwd.cfg"), None);
    }

    #[test]
    fn test_generate_password() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.len(), DEVICE_PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_id_is_unique_hex() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_id());
    }
}
