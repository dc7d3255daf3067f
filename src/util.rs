use regex::Regex;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating at zero on clock skew.
pub fn now_epoch_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn item_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\{([A-F0-9-]+)\}").expect("item id regex"))
}

/// Extract a brace-delimited hex item id from a host attribute value.
///
/// The id is returned re-wrapped in braces with the captured casing intact,
/// e.g. `javascript:open('{1A2B-...}')` yields `{1A2B-...}`. Returns `None`
/// when no token is present.
pub fn extract_item_id(attr: &str) -> Option<String> {
    item_id_regex()
        .captures(attr)
        .map(|caps| format!("{{{}}}", &caps[1]))
}

/// Normalize a workflow-state id for comparison: strip decorative braces and
/// upper-case the rest.
pub fn normalize_state_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect::<String>()
        .to_uppercase()
}

/// Strip scheme and path from a configured domain and lower-case it, so it
/// can be compared against a bare hostname.
pub fn normalize_domain(domain: &str) -> String {
    let without_scheme = domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain);
    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme);
    host.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_braced_hex_token() {
        let attr = "javascript:scForm.postRequest('{0DE95AE4-41AB-4D01-9EB0-67441B7C2450}')";
        assert_eq!(
            extract_item_id(attr).as_deref(),
            Some("{0DE95AE4-41AB-4D01-9EB0-67441B7C2450}")
        );
    }

    #[test]
    fn extract_keeps_original_casing() {
        assert_eq!(extract_item_id("x('{ab-12}')").as_deref(), Some("{ab-12}"));
    }

    #[test]
    fn extract_rejects_missing_or_malformed_tokens() {
        assert_eq!(extract_item_id("no id here"), None);
        assert_eq!(extract_item_id("{not hex!}"), None);
        assert_eq!(extract_item_id(""), None);
    }

    #[test]
    fn normalize_strips_braces_and_uppercases() {
        assert_eq!(normalize_state_id("{ab-cd}"), "AB-CD");
        assert_eq!(normalize_state_id("AB-CD"), "AB-CD");
    }

    #[test]
    fn normalize_domain_strips_scheme_and_path() {
        assert_eq!(normalize_domain("https://CMS.example.com/admin"), "cms.example.com");
        assert_eq!(normalize_domain("cms.example.com"), "cms.example.com");
        assert_eq!(normalize_domain(""), "");
    }
}
