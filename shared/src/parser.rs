use crate::error::McmpError;

/// Decode a single `%HH`-escaped string into its octets, rejecting any
/// decoded text containing a character that could break the wire framing
/// or get echoed unescaped into an HTML report (`<`, `>`, `"`, `'`, CR, LF).
fn percent_decode(token: &str) -> Result<String, McmpError> {
    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .ok_or_else(|| McmpError::syntax("truncated percent-escape"))?;
                let hi = hex_value(hex[0])
                    .ok_or_else(|| McmpError::syntax("invalid percent-escape"))?;
                let lo = hex_value(hex[1])
                    .ok_or_else(|| McmpError::syntax("invalid percent-escape"))?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    let decoded = String::from_utf8(out).map_err(|_| McmpError::syntax("invalid UTF-8 in body"))?;
    if decoded.contains(['<', '>', '"', '\'', '\r', '\n']) {
        return Err(McmpError::syntax(
            "decoded value contains a forbidden character",
        ));
    }
    Ok(decoded)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Tokenize an MCMP request body of the form `k1=v1&k2=v2&...` into an
/// ordered, percent-decoded key/value sequence.
///
/// The parser always yields pairs: an empty body, a trailing empty pair,
/// or a final key with no value are all `SYNTAX` failures rather than
/// silently-dropped tokens.
pub fn parse_body(body: &str) -> Result<Vec<(String, String)>, McmpError> {
    if body.is_empty() {
        return Err(McmpError::syntax("empty body"));
    }

    let mut pairs = Vec::new();
    for segment in body.split('&') {
        if segment.is_empty() {
            return Err(McmpError::syntax("empty parameter in body"));
        }
        let mut split = segment.splitn(2, '=');
        let key = split.next().unwrap();
        let Some(value) = split.next() else {
            return Err(McmpError::syntax(format!(
                "key \"{key}\" has no value"
            )));
        };
        if key.is_empty() {
            return Err(McmpError::syntax("empty key in body"));
        }
        if value.contains('=') {
            return Err(McmpError::syntax("unescaped '=' in value"));
        }
        let key = percent_decode(key)?;
        let value = percent_decode(value)?;
        pairs.push((key, value));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_pairs_in_order() {
        let pairs = parse_body("JVMRoute=node1&Host=10.0.0.1&Port=8009").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("JVMRoute".to_string(), "node1".to_string()),
                ("Host".to_string(), "10.0.0.1".to_string()),
                ("Port".to_string(), "8009".to_string()),
            ]
        );
    }

    #[test]
    fn decodes_percent_escapes_case_insensitively() {
        let pairs = parse_body("Alias=foo%2ebar&Context=%2fapp").unwrap();
        assert_eq!(pairs[0].1, "foo.bar");
        assert_eq!(pairs[1].1, "/app");

        let pairs_upper = parse_body("Alias=foo%2Ebar").unwrap();
        assert_eq!(pairs_upper[0].1, "foo.bar");
    }

    #[test]
    fn rejects_empty_body() {
        assert!(parse_body("").is_err());
    }

    #[test]
    fn rejects_trailing_empty_pair() {
        assert!(parse_body("JVMRoute=node1&").is_err());
    }

    #[test]
    fn rejects_key_without_value() {
        assert!(parse_body("JVMRoute").is_err());
        assert!(parse_body("JVMRoute=node1&Host").is_err());
    }

    #[test]
    fn rejects_forbidden_decoded_characters() {
        // %3C decodes to '<'
        assert!(parse_body("Alias=%3Cscript%3E").is_err());
        assert!(parse_body("Alias=foo%22bar").is_err());
        assert!(parse_body("Alias=foo%0dbar").is_err());
    }

    #[test]
    fn percent_decode_round_trips_for_reserved_free_bytes() {
        let raw = "hello-world_123";
        let pairs = parse_body(&format!("k={raw}")).unwrap();
        assert_eq!(pairs[0].1, raw);
    }

    #[test]
    fn repeated_parameters_are_all_preserved_in_order() {
        let pairs = parse_body("Alias=a.com&Context=/a&Alias=b.com&Context=/b").unwrap();
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0].0, "Alias");
        assert_eq!(pairs[2].0, "Alias");
    }
}
