//! Response body decoding

use encoding_rs::Encoding;

/// Pull the `charset` parameter out of a `Content-Type` value.
pub fn extract_charset(content_type: Option<&str>) -> Option<String> {
    content_type?.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_ascii_lowercase())
        } else {
            None
        }
    })
}

/// Decode a body using the declared charset, falling back to lossy UTF-8.
pub fn decode_body_with_charset(body: Vec<u8>, content_type: Option<&str>) -> String {
    let encoding = extract_charset(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()));

    match encoding {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(&body);
            decoded.into_owned()
        }
        None => match String::from_utf8(body) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_body_with_charset, extract_charset};
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn extract_charset_parses_case_insensitive() {
        assert_eq!(
            extract_charset(Some("text/plain; charset=utf-8")),
            Some("utf-8".to_string())
        );
        assert_eq!(
            extract_charset(Some("text/plain; CHARSET=\"ISO-8859-1\"")),
            Some("iso-8859-1".to_string())
        );
        assert_eq!(extract_charset(Some("text/plain")), None);
        assert_eq!(extract_charset(None), None);
    }

    #[test]
    fn decode_body_with_charset_uses_declared_encoding() {
        let (encoded, _, _) = WINDOWS_1252.encode("\u{00A3}");
        let decoded = decode_body_with_charset(
            encoded.into_owned(),
            Some("text/plain; charset=windows-1252"),
        );
        assert_eq!(decoded, "\u{00A3}");
    }

    #[test]
    fn decode_body_with_charset_falls_back_on_unknown_charset() {
        let body = vec![0xE3, 0x81, 0x82]; // "あ" in UTF-8
        let decoded = decode_body_with_charset(body, Some("text/plain; charset=unknown"));
        assert!(decoded.contains('あ'));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let decoded = decode_body_with_charset(vec![b'o', b'k', 0xFF], None);
        assert_eq!(decoded, "ok\u{FFFD}");
    }
}
