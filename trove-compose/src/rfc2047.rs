//! RFC 2047 encoded-word support for header fields that may contain non-ASCII
//! text (`Subject`, display names), per `spec.md` §4.9.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encodes `text` as a single `=?UTF-8?B?...?=` encoded word if it contains any
/// non-ASCII byte; returns it unchanged otherwise. `B` (base64), not `Q`, to reuse
/// the same `base64` crate already pulled in for MIME attachment bodies rather
/// than hand-rolling a second, narrower escaping scheme for headers.
pub fn encode_unstructured(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
}

/// Same encoding, used for the display-name half of an address header
/// (`MailAddress::as_mail_header`); kept as a separate entry point so a future
/// RFC 2047 "phrase" quoting rule (distinct from "unstructured text") has
/// somewhere to live without touching `Subject` encoding.
pub fn encode_phrase(text: &str) -> String {
    encode_unstructured(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_subject_is_untouched() {
        assert_eq!(encode_unstructured("Hello"), "Hello");
    }

    #[test]
    fn non_ascii_subject_is_base64_encoded_word() {
        let encoded = encode_unstructured("Héllo");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }
}
