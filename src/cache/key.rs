//! Request fingerprints.
//!
//! A [`CacheKey`] is `"{namespace}:{sha256 hex}"`. The digest covers the
//! payload, the language and every output-affecting option field the
//! modality reports, each length-prefixed so that field boundaries cannot
//! shift (`"ab" + "c"` and `"a" + "bc"` fingerprint differently). The
//! namespace prefix lets
//! [`ResponseCache::invalidate_by_prefix`](super::ResponseCache::invalidate_by_prefix)
//! drop a whole modality at once.

use std::fmt;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint a request.
    ///
    /// Language is trimmed and lowercased. Payload and `fields` are hashed
    /// verbatim, so callers pass fields already in canonical form.
    pub fn fingerprint<S: AsRef<str>>(
        namespace: &str,
        payload: &str,
        language: &str,
        fields: &[S],
    ) -> Self {
        let language = language.trim().to_ascii_lowercase();

        let mut hasher = Sha256::new();
        hasher.update((fields.len() as u64).to_be_bytes());
        let all = [payload, language.as_str()]
            .into_iter()
            .chain(fields.iter().map(S::as_ref));
        for field in all {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        Self(format!("{namespace}:{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(namespace: &str, payload: &str, language: &str, fields: &[&str]) -> CacheKey {
        CacheKey::fingerprint(namespace, payload, language, fields)
    }

    #[test]
    fn deterministic() {
        let a = key("text", "hello", "en", &["gpt-4o", "text"]);
        let b = key("text", "hello", "en", &["gpt-4o", "text"]);
        assert_eq!(a, b);
    }

    #[test]
    fn namespaced() {
        let k = key("speech", "hello", "en", &["nova", "mp3"]);
        assert!(k.as_str().starts_with("speech:"));
        // namespace + ':' + 64 hex chars
        assert_eq!(k.as_str().len(), "speech:".len() + 64);
    }

    #[test]
    fn language_is_canonicalized() {
        let a = key("speech", "hi", "EN ", &["nova", "mp3"]);
        let b = key("speech", "hi", "en", &["nova", "mp3"]);
        assert_eq!(a, b);
    }

    #[test]
    fn differs_on_each_field() {
        let base = key("text", "hello", "en", &["m", "text"]);
        assert_ne!(base, key("text", "hello!", "en", &["m", "text"]));
        assert_ne!(base, key("text", "hello", "fr", &["m", "text"]));
        assert_ne!(base, key("text", "hello", "en", &["n", "text"]));
        assert_ne!(base, key("text", "hello", "en", &["m", "json"]));
        assert_ne!(base, key("speech", "hello", "en", &["m", "text"]));
    }

    #[test]
    fn field_boundaries_matter() {
        assert_ne!(
            key("text", "ab", "c", &["m", "text"]),
            key("text", "a", "bc", &["m", "text"])
        );
        assert_ne!(
            key("text", "p", "en", &["ab", "c"]),
            key("text", "p", "en", &["a", "bc"])
        );
    }

    #[test]
    fn field_count_matters() {
        assert_ne!(
            key("text", "p", "en", &["m", ""]),
            key("text", "p", "en", &["m"])
        );
    }
}
