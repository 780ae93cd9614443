use ammonia::Builder;
use std::collections::HashSet;

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Plain text only: every tag is stripped, the text inside is kept.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(HashSet::new())
        .clean(text)
        .to_string()
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_markup() {
        assert_eq!(sanitize_text("<b>Ann</b>"), "Ann");
        assert_eq!(sanitize_text("<script>alert(1)</script>Bob"), "Bob");
        assert_eq!(sanitize_text("plain"), "plain");
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let ts = now_iso();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let ids = vec!["b", "a", "b", "c", "a"].into_iter().map(String::from).collect();
        assert_eq!(dedup_ids(ids), vec!["b", "a", "c"]);
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank("   "));
        assert!(!is_blank(" x "));
    }
}
