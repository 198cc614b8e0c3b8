//! Quoted-printable encoding (RFC 2045 §6.7), used for the `text/plain` body part
//! per `spec.md` §4.9. No crate in the reference workspace's stack (or the rest of
//! the example pack) provides this narrow an encoding, so it's hand-rolled the way
//! `Imap::quotedPrintableEncode` is in the original tool's `Encoders.cpp` —
//! straight-line byte pushing, no external dependency pulled in for one RFC's worth
//! of escaping.

const LINE_LIMIT: usize = 76;

/// Encodes `input` (already UTF-8) as quoted-printable text, wrapping soft line
/// breaks (`=\r\n`) so no output line exceeds 76 characters, and hard-wrapping at
/// each `\n` in the source.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut col = 0usize;

    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        if byte == b'\n' {
            out.push(b'\r');
            out.push(b'\n');
            col = 0;
            i += 1;
            continue;
        }
        if byte == b'\r' {
            // Normalize bare CR (and CRLF) to CRLF; the \n branch above emits it.
            i += 1;
            continue;
        }

        let needs_escape = !(0x20..=0x7e).contains(&byte) || byte == b'=';
        let width = if needs_escape { 3 } else { 1 };

        if col + width > LINE_LIMIT {
            out.push(b'=');
            out.push(b'\r');
            out.push(b'\n');
            col = 0;
        }

        if needs_escape {
            out.extend_from_slice(format!("={:02X}", byte).as_bytes());
        } else {
            out.push(byte);
        }
        col += width;
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_text_passes_through_with_crlf_line_endings() {
        let encoded = encode(b"hello\nworld\n");
        assert_eq!(encoded, b"hello\r\nworld\r\n");
    }

    #[test]
    fn non_ascii_bytes_are_escaped() {
        let encoded = encode("é".as_bytes());
        // 'é' is 0xC3 0xA9 in UTF-8.
        assert_eq!(encoded, b"=C3=A9");
    }

    #[test]
    fn equals_sign_is_always_escaped() {
        assert_eq!(encode(b"a=b"), b"a=3Db");
    }

    #[test]
    fn long_lines_get_a_soft_break() {
        let line = "a".repeat(80);
        let encoded = encode(line.as_bytes());
        let text = String::from_utf8(encoded).unwrap();
        assert!(text.contains("=\r\n"));
        for line in text.split("\r\n") {
            assert!(line.len() <= LINE_LIMIT);
        }
    }
}
