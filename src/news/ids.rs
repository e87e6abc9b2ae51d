const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 8;

/// Derive a short, stable article identifier from its URL.
///
/// The URL is trimmed and lower-cased, folded over its UTF-16 code units with
/// a 32-bit shift-and-subtract hash (kept non-negative after every step), and
/// rendered as at most eight base-36 digits. Identifiers must stay stable
/// across releases because front-end links embed them.
pub fn generate_id_from_url(url: &str) -> String {
    let normalized = url.trim().to_lowercase();

    // Up to 2^31 after `abs`, so it does not fit an i32.
    let mut hash: i64 = 0;
    for unit in normalized.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        let next = shifted - hash + unit as i64;
        hash = (next as i32 as i64).abs();
    }

    let mut id = to_base36(hash as u64);
    id.truncate(ID_LEN);
    id
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_identifiers() {
        assert_eq!(generate_id_from_url("https://www.bbc.co.uk/news/world-123"), "ml5jc9");
        assert_eq!(
            generate_id_from_url("https://www.reuters.com/world/europe/some-long-article-slug-2024-03-01/"),
            "b1mmci"
        );
        assert_eq!(generate_id_from_url("a"), "2p");
        assert_eq!(generate_id_from_url(""), "0");
    }

    #[test]
    fn test_ignores_case_and_surrounding_whitespace() {
        assert_eq!(
            generate_id_from_url("  HTTPS://www.BBC.co.uk/news/world-123 "),
            generate_id_from_url("https://www.bbc.co.uk/news/world-123")
        );
    }

    #[test]
    fn test_hashes_utf16_code_units() {
        assert_eq!(generate_id_from_url("https://example.com/é"), "pnwn8k");
    }

    #[test]
    fn test_long_urls_stay_short() {
        let url: String = (0..200)
            .map(|i| format!("https://news.example.org/story/{}", i))
            .collect();
        let id = generate_id_from_url(&url);
        assert_eq!(id, "9qz6es");
        assert!(id.len() <= 8);
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(2_147_483_648), "zik0zk");
    }
}
