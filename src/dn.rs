//! Distinguished Names
//!
//! Byte-level helpers over normalized DN strings, plus the normalization
//! seam used when compiling patterns.
//!
//! The engine only ever compares normalized DNs; how a raw DN becomes
//! normalized belongs to the directory and is plugged in through
//! [`DnNormalizer`].

use thiserror::Error;

/// RDN separator in string DNs
pub const RDN_SEPARATOR: u8 = b',';

const ESCAPE: u8 = b'\\';

/// Result type for DN normalization
pub type DnResult<T> = Result<T, DnError>;

/// DN normalization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    #[error("empty RDN at position {position}")]
    EmptyRdn { position: usize },

    #[error("RDN \"{rdn}\" has no '=' separating type and value")]
    MissingAttributeValue { rdn: String },

    #[error("RDN \"{rdn}\" has an empty attribute type")]
    EmptyAttributeType { rdn: String },

    #[error("DN ends with a dangling escape")]
    DanglingEscape,
}

/// Turns a raw DN into its normalized form
pub trait DnNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> DnResult<String>;
}

/// Whether the byte at `idx` is an RDN separator not preceded by an escape
pub fn is_unescaped_separator(dn: &[u8], idx: usize) -> bool {
    if dn.get(idx) != Some(&RDN_SEPARATOR) {
        return false;
    }
    let escapes = dn[..idx].iter().rev().take_while(|&&b| b == ESCAPE).count();
    escapes % 2 == 0
}

/// Length in bytes of the leading RDN of `dn`
pub fn first_rdn_len(dn: &str) -> usize {
    let bytes = dn.as_bytes();
    (0..bytes.len())
        .find(|&i| is_unescaped_separator(bytes, i))
        .unwrap_or(bytes.len())
}

/// Split a DN into its RDNs at unescaped separators
pub fn split_rdns(dn: &str) -> Vec<&str> {
    if dn.is_empty() {
        return Vec::new();
    }
    let bytes = dn.as_bytes();
    let mut rdns = Vec::new();
    let mut start = 0;
    for i in 0..bytes.len() {
        if is_unescaped_separator(bytes, i) {
            rdns.push(&dn[start..i]);
            start = i + 1;
        }
    }
    rdns.push(&dn[start..]);
    rdns
}

/// Default normalizer for case-ignore directories.
///
/// Each RDN is trimmed and lower-cased on both the attribute type and the
/// value, and RDNs are re-joined with a bare `,`. Escapes are kept verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleDnNormalizer;

impl DnNormalizer for SimpleDnNormalizer {
    fn normalize(&self, raw: &str) -> DnResult<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(String::new());
        }
        if has_dangling_escape(raw) {
            return Err(DnError::DanglingEscape);
        }

        let mut normalized = Vec::new();
        for (position, rdn) in split_rdns(raw).into_iter().enumerate() {
            let rdn = rdn.trim_start();
            if rdn.trim_end().is_empty() {
                return Err(DnError::EmptyRdn { position });
            }
            let eq = rdn.find('=').ok_or_else(|| DnError::MissingAttributeValue {
                rdn: rdn.to_string(),
            })?;
            let attr = rdn[..eq].trim();
            if attr.is_empty() {
                return Err(DnError::EmptyAttributeType {
                    rdn: rdn.to_string(),
                });
            }
            let value = trim_value(&rdn[eq + 1..]);
            normalized.push(format!(
                "{}={}",
                attr.to_ascii_lowercase(),
                value.to_lowercase()
            ));
        }
        Ok(normalized.join(","))
    }
}

fn has_dangling_escape(dn: &str) -> bool {
    dn.bytes().rev().take_while(|&b| b == ESCAPE).count() % 2 == 1
}

/// Trim surrounding spaces, keeping a trailing space that is escaped
fn trim_value(value: &str) -> &str {
    let value = value.trim_start();
    let mut end = value.len();
    let bytes = value.as_bytes();
    while end > 0 && bytes[end - 1] == b' ' {
        let escapes = bytes[..end - 1]
            .iter()
            .rev()
            .take_while(|&&b| b == ESCAPE)
            .count();
        if escapes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescaped_separator() {
        let dn = br"cn=a\,b,dc=com";
        assert!(!is_unescaped_separator(dn, 5));
        assert!(is_unescaped_separator(dn, 7));
        assert!(!is_unescaped_separator(dn, 0));

        let double = br"cn=a\\,dc=com";
        assert!(is_unescaped_separator(double, 6));
    }

    #[test]
    fn test_first_rdn_len() {
        assert_eq!(first_rdn_len("cn=x,dc=com"), 4);
        assert_eq!(first_rdn_len(r"cn=a\,b,dc=com"), 7);
        assert_eq!(first_rdn_len("dc=com"), 6);
    }

    #[test]
    fn test_split_rdns() {
        assert_eq!(split_rdns("cn=x,dc=example,dc=com").len(), 3);
        assert_eq!(split_rdns(r"cn=a\,b,dc=com"), vec![r"cn=a\,b", "dc=com"]);
        assert!(split_rdns("").is_empty());
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        let n = SimpleDnNormalizer;
        assert_eq!(
            n.normalize(" CN=John Doe , DC=Example,dc=COM ").unwrap(),
            "cn=john doe,dc=example,dc=com"
        );
        assert_eq!(n.normalize("").unwrap(), "");
    }

    #[test]
    fn test_normalize_keeps_escapes() {
        let n = SimpleDnNormalizer;
        assert_eq!(
            n.normalize(r"cn=Smith\, J,dc=com").unwrap(),
            r"cn=smith\, j,dc=com"
        );
        assert_eq!(n.normalize(r"cn=pad\ ,dc=com").unwrap(), r"cn=pad\ ,dc=com");
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        let n = SimpleDnNormalizer;
        assert!(matches!(
            n.normalize("cn=x,,dc=com"),
            Err(DnError::EmptyRdn { position: 1 })
        ));
        assert!(matches!(
            n.normalize("example"),
            Err(DnError::MissingAttributeValue { .. })
        ));
        assert!(matches!(
            n.normalize("=x,dc=com"),
            Err(DnError::EmptyAttributeType { .. })
        ));
        assert_eq!(n.normalize(r"cn=x\"), Err(DnError::DanglingEscape));
    }
}
