use std::fmt;

use serde_json::Value;

/// A URI-like schema locator, optionally carrying a fragment (JSON Pointer
/// or anchor name).
///
/// Two references are equal iff their normalized string forms are equal:
/// an empty or lone trailing `#` is stripped, so `http://x/schema#` and
/// `http://x/schema` identify the same document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonReference {
    value: String,
}

impl JsonReference {
    pub fn new(reference: &str) -> Self {
        let trimmed = reference.trim();
        let value = match trimmed.split_once('#') {
            Some((uri, "")) => uri.to_string(),
            _ => trimmed.to_string(),
        };
        Self { value }
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The document part, without any fragment.
    pub fn uri(&self) -> &str {
        match self.value.split_once('#') {
            Some((uri, _)) => uri,
            None => &self.value,
        }
    }

    /// The fragment, if any. A JSON Pointer fragment starts with `/`;
    /// anything else names an anchor.
    pub fn fragment(&self) -> Option<&str> {
        self.value.split_once('#').map(|(_, f)| f)
    }

    /// The same document with a different fragment.
    pub fn with_fragment(&self, fragment: &str) -> Self {
        if fragment.is_empty() {
            Self::new(self.uri())
        } else {
            Self {
                value: format!("{}#{}", self.uri(), fragment),
            }
        }
    }

    /// This reference without its fragment.
    pub fn without_fragment(&self) -> Self {
        Self::new(self.uri())
    }

    /// Extend the fragment pointer by one token, escaping `~` and `/`
    /// per RFC 6901.
    pub fn append_pointer(&self, token: &str) -> Self {
        let escaped = token.replace('~', "~0").replace('/', "~1");
        let fragment = match self.fragment() {
            Some(f) => format!("{f}/{escaped}"),
            None => format!("/{escaped}"),
        };
        self.with_fragment(&fragment)
    }

    /// Resolve `reference` against this base, per the usual relative-URI
    /// rules: fragment-only references stay in this document, absolute
    /// references replace the base, and relative paths are merged against
    /// the base's directory.
    pub fn join(&self, reference: &str) -> Self {
        let reference = reference.trim();
        if let Some(fragment) = reference.strip_prefix('#') {
            return self.without_fragment().with_fragment(fragment);
        }
        if is_absolute(reference) {
            return Self::new(reference);
        }

        let (path, fragment) = match reference.split_once('#') {
            Some((p, f)) => (p, Some(f)),
            None => (reference, None),
        };

        let base = self.uri();
        let merged = if let Some(rest) = path.strip_prefix('/') {
            // Path-absolute: keep the base's authority, replace the path.
            match base.find("://").map(|i| i + 3) {
                Some(authority_start) => match base[authority_start..].find('/') {
                    Some(path_start) => {
                        format!("{}/{}", &base[..authority_start + path_start], rest)
                    }
                    None => format!("{base}/{rest}"),
                },
                None => format!("/{rest}"),
            }
        } else {
            let dir = match base.rfind('/') {
                Some(i) => &base[..=i],
                None => "",
            };
            format!("{dir}{path}")
        };

        let joined = Self::new(&normalize_path(&merged));
        match fragment {
            Some(f) => joined.with_fragment(f),
            None => joined,
        }
    }

    /// The locator a fragment-addressed subschema takes when it is rebased
    /// to act as a document root: the fragment pointer becomes extra path
    /// segments of the document URI, so relative references inside the
    /// subschema resolve against the new root.
    pub fn rebased_root(&self) -> Self {
        match self.fragment() {
            Some(pointer) if pointer.starts_with('/') => {
                Self::new(&format!("{}{}", self.uri().trim_end_matches('/'), pointer))
            }
            _ => self.without_fragment(),
        }
    }
}

impl fmt::Display for JsonReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<&str> for JsonReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

fn is_absolute(reference: &str) -> bool {
    if reference.contains("://") {
        return true;
    }
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Collapse `.` and `..` segments in the path part of a locator.
fn normalize_path(path: &str) -> String {
    let (prefix, rest) = match path.find("://").map(|i| i + 3) {
        Some(authority_start) => match path[authority_start..].find('/') {
            Some(path_start) => path.split_at(authority_start + path_start),
            None => (path, ""),
        },
        None => ("", path),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("{prefix}{}", segments.join("/"))
}

/// Navigate a fragment within a parsed document. A pointer fragment walks
/// object keys and array indices; any other fragment is looked up as an
/// `$anchor` (or `$dynamicAnchor`) anywhere in the document.
pub fn resolve_fragment<'v>(document: &'v Value, fragment: &str) -> Option<&'v Value> {
    if fragment.is_empty() {
        return Some(document);
    }
    if let Some(pointer) = fragment.strip_prefix('/') {
        let mut current = document;
        for token in pointer.split('/') {
            let token = token.replace("~1", "/").replace("~0", "~");
            current = match current {
                Value::Object(map) => map.get(&token)?,
                Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    } else {
        find_anchor(document, fragment)
    }
}

fn find_anchor<'v>(value: &'v Value, name: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => {
            let declared = map
                .get("$anchor")
                .or_else(|| map.get("$dynamicAnchor"))
                .and_then(Value::as_str);
            if declared == Some(name) {
                return Some(value);
            }
            map.values().find_map(|v| find_anchor(v, name))
        }
        Value::Array(items) => items.iter().find_map(|v| find_anchor(v, name)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_empty_fragment() {
        let a = JsonReference::new("https://example.com/schema#");
        let b = JsonReference::new("https://example.com/schema");
        assert_eq!(a, b);
        assert_eq!(a.fragment(), None);
    }

    #[test]
    fn fragment_round_trip() {
        let r = JsonReference::new("person.json#/properties/name");
        assert_eq!(r.uri(), "person.json");
        assert_eq!(r.fragment(), Some("/properties/name"));
        assert_eq!(r.without_fragment().as_str(), "person.json");
    }

    #[test]
    fn append_pointer_escapes_tokens() {
        let r = JsonReference::new("schema.json");
        let extended = r.append_pointer("properties").append_pointer("a/b~c");
        assert_eq!(extended.as_str(), "schema.json#/properties/a~1b~0c");
    }

    #[test]
    fn join_fragment_only() {
        let base = JsonReference::new("https://example.com/schemas/person.json#/x");
        let joined = base.join("#/$defs/address");
        assert_eq!(
            joined.as_str(),
            "https://example.com/schemas/person.json#/$defs/address"
        );
    }

    #[test]
    fn join_relative_path() {
        let base = JsonReference::new("https://example.com/schemas/person.json");
        assert_eq!(
            base.join("address.json").as_str(),
            "https://example.com/schemas/address.json"
        );
        assert_eq!(
            base.join("../common/name.json#/x").as_str(),
            "https://example.com/common/name.json#/x"
        );
    }

    #[test]
    fn join_absolute() {
        let base = JsonReference::new("https://example.com/schemas/person.json");
        assert_eq!(
            base.join("https://other.org/s.json").as_str(),
            "https://other.org/s.json"
        );
    }

    #[test]
    fn join_path_absolute_keeps_authority() {
        let base = JsonReference::new("https://example.com/schemas/person.json");
        assert_eq!(
            base.join("/shared/base.json").as_str(),
            "https://example.com/shared/base.json"
        );
    }

    #[test]
    fn rebased_root_appends_pointer_as_path() {
        let r = JsonReference::new("https://example.com/person.json#/$defs/address");
        assert_eq!(
            r.rebased_root().as_str(),
            "https://example.com/person.json/$defs/address"
        );
    }

    #[test]
    fn resolve_pointer_fragment() {
        let doc = json!({"a": {"b/c": [1, {"d": true}]}});
        let v = resolve_fragment(&doc, "/a/b~1c/1/d").unwrap();
        assert_eq!(v, &json!(true));
        assert!(resolve_fragment(&doc, "/a/missing").is_none());
    }

    #[test]
    fn resolve_anchor_fragment() {
        let doc = json!({"$defs": {"addr": {"$anchor": "address", "type": "object"}}});
        let v = resolve_fragment(&doc, "address").unwrap();
        assert_eq!(v["type"], "object");
    }
}
