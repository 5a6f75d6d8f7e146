//! Ordered substring-signature classification of free-form results.
//!
//! Lists are data: the first signature in list order that occurs anywhere in
//! the text wins, regardless of where in the text it occurs. Matching is
//! case-sensitive and runs over serialized JSON, so a signature can match
//! inside any field of the payload.

use serde_json::Value;

/// A named, ordered list of `(substring, category)` pairs with a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureList {
    /// Ordered signatures; earlier entries take precedence.
    pub signatures: &'static [(&'static str, &'static str)],
    /// Category returned when nothing matches.
    pub default: &'static str,
}

/// Signatures for rejected edits. Each substring is its own category.
pub const EDIT_SIGNATURES: SignatureList = SignatureList {
    signatures: &[
        ("protectedpage", "protectedpage"),
        ("titleblacklist", "titleblacklist"),
        ("ratelimited", "ratelimited"),
        ("editconflict", "editconflict"),
        ("spam filter", "spam filter"),
        ("abusefilter", "abusefilter"),
        ("mwoauth-invalid-authorization", "mwoauth-invalid-authorization"),
    ],
    default: "errors",
};

/// Signatures for failed site-links.
pub const LINK_SIGNATURES: SignatureList = SignatureList {
    signatures: &[
        ("Links to user pages", "wd_user_pages"),
        ("get_csrftoken", "wd_csrftoken"),
        ("protectedpage", "wd_protectedpage"),
    ],
    default: "wd_errors",
};

impl SignatureList {
    /// Category of the first signature present in `text`.
    #[must_use]
    pub fn classify(&self, text: &str) -> &'static str {
        self.signatures
            .iter()
            .find(|(needle, _)| text.contains(needle))
            .map_or(self.default, |(_, category)| category)
    }

    /// Classifies the compact JSON serialization of `value`.
    #[must_use]
    pub fn classify_value(&self, value: &Value) -> &'static str {
        self.classify(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn list_order_beats_text_order() {
        let text = "abusefilter tripped, then protectedpage";
        assert_eq!(EDIT_SIGNATURES.classify(text), "protectedpage");
    }

    #[test]
    fn unmatched_text_gets_default() {
        assert_eq!(EDIT_SIGNATURES.classify("something odd"), "errors");
        assert_eq!(LINK_SIGNATURES.classify("something odd"), "wd_errors");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(EDIT_SIGNATURES.classify("ProtectedPage"), "errors");
        assert_eq!(LINK_SIGNATURES.classify("links to user pages"), "wd_errors");
    }

    #[test]
    fn serialized_payload_matches_nested_fields() {
        let payload =
            json!({"error": {"code": "abusefilter-disallowed", "info": "Spam filter hit"}});
        assert_eq!(EDIT_SIGNATURES.classify_value(&payload), "abusefilter");

        let payload = json!({"error": {"code": "x", "info": "blocked by the spam filter"}});
        assert_eq!(EDIT_SIGNATURES.classify_value(&payload), "spam filter");
    }

    #[test]
    fn token_failure_string_classifies_as_csrf() {
        assert_eq!(LINK_SIGNATURES.classify_value(&json!("get_csrftoken failed")), "wd_csrftoken");
        let user_pages =
            json!({"code": "failed-save", "info": "Links to user pages are not allowed"});
        assert_eq!(LINK_SIGNATURES.classify_value(&user_pages), "wd_user_pages");
    }
}
