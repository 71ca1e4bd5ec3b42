use crate::error::CloneError;
use crate::util::sanitize_url;
use std::fmt;
use url::Url;

/// A remote repository location that passed scheme and syntax checks.
///
/// URLs carrying userinfo are rejected: credentials travel only as a
/// [`Credential`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    url: Url,
}

impl RepositoryReference {
    pub fn parse(raw: &str, allowed_schemes: &[String]) -> Result<Self, CloneError> {
        let url = Url::parse(raw.trim()).map_err(|e| CloneError::InvalidUrl {
            url: sanitize_url(raw),
            reason: e.to_string(),
        })?;

        if !allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(url.scheme()))
        {
            return Err(CloneError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                allowed: allowed_schemes.join(", "),
            });
        }

        if !url.username().is_empty() || url.password().is_some() {
            return Err(CloneError::InvalidUrl {
                url: sanitize_url(raw),
                reason: "embedded credentials are not accepted; pass a token instead".to_string(),
            });
        }

        if url.scheme() != "file" && url.host_str().is_none() {
            return Err(CloneError::InvalidUrl {
                url: url.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Opaque access token.
///
/// Moved into the clone or push that needs it and dropped there. It has no
/// `Display`, no serde impls, and a redacted `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// `None` for absent or blank tokens.
    pub fn from_optional(token: Option<String>) -> Option<Self> {
        token.filter(|t| !t.trim().is_empty()).map(Self)
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
