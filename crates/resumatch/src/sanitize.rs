//! Helpers for keeping personal data out of logs and span attributes.
//!
//! Resumes carry names, phone numbers and email addresses; log lines only
//! ever see file names and masked contact fields.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks a contact value, keeping just enough to correlate records.
///
/// - `zhangsan@example.com` → `z***@example.com`
/// - `13812345678` → `138****5678`
/// - anything shorter than five characters → `***`
pub fn mask_contact(value: &str) -> String {
    let value = value.trim();

    if let Some((local, domain)) = value.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{}***@{}", first, domain);
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 5 {
        return "***".to_string();
    }
    let keep = if chars.len() >= 11 { 3 } else { 1 };
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}****{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_redact_path_returns_filename() {
        let path = PathBuf::from("/srv/uploads/pending/张三_简历.pdf");
        assert_eq!(redact_path(&path), "张三_简历.pdf");
    }

    #[test]
    fn test_redact_path_no_filename() {
        assert_eq!(redact_path(Path::new("/")), "<unknown>");
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_contact("zhangsan@example.com"), "z***@example.com");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_contact("13812345678"), "138****5678");
        assert_eq!(mask_contact("+1 555-0100"), "+1 ****0100");
    }

    #[test]
    fn test_mask_short_values() {
        assert_eq!(mask_contact("暂无"), "***");
        assert_eq!(mask_contact(""), "***");
    }
}
