//! Numeric field keys produced by the canister's interface serializer.
//!
//! Record fields the client has no type information for arrive keyed by the
//! label hash of their name instead of the name itself. Depending on the
//! decoder the hash shows up bare (`1224700491`), digit-grouped
//! (`1_224_700_491`) or wrapped in underscores (`_1224700491_`).

/// Label hash of a field name: `h = h * 223 + byte`, modulo 2^32.
pub fn wire_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(223).wrapping_add(u32::from(b)))
}

/// All key spellings under which `name` may arrive as a hash key.
pub fn hash_key_forms(name: &str) -> [String; 3] {
    let hash = wire_hash(name);
    let plain = hash.to_string();
    let grouped = group_digits(&plain);
    let wrapped = format!("_{}_", plain);
    [plain, grouped, wrapped]
}

/// True when `key` is already a numeric key (any of the spellings above).
pub fn is_numeric_key(key: &str) -> bool {
    let trimmed = key.trim_matches('_');
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit() || c == '_')
}

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let lead = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push('_');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backend_keys() {
        // Keys observed in pharmacy and wellness responses.
        assert_eq!(wire_hash("medicine_id"), 1_098_344_064);
        assert_eq!(wire_hash("name"), 1_224_700_491);
        assert_eq!(wire_hash("category"), 2_909_547_262);
        assert_eq!(wire_hash("requires_prescription"), 3_699_773_643);
        assert_eq!(wire_hash("date"), 1_113_806_382);
        assert_eq!(wire_hash("steps"), 2_215_541_671);
    }

    #[test]
    fn test_key_forms() {
        let [plain, grouped, wrapped] = hash_key_forms("name");
        assert_eq!(plain, "1224700491");
        assert_eq!(grouped, "1_224_700_491");
        assert_eq!(wrapped, "_1224700491_");
    }

    #[test]
    fn test_grouping_short_numbers() {
        assert_eq!(group_digits("829945655"), "829_945_655");
        assert_eq!(group_digits("23515"), "23_515");
        assert_eq!(group_digits("12"), "12");
    }

    #[test]
    fn test_numeric_key_detection() {
        assert!(is_numeric_key("1_224_700_491"));
        assert!(is_numeric_key("_1224700491_"));
        assert!(!is_numeric_key("name"));
        assert!(!is_numeric_key("___"));
    }
}
