//! Client identity keys for admission accounting.

/// Identity string used to bucket admission accounting for one client.
///
/// Derived from request origin metadata by the HTTP layer. The key is not
/// guaranteed unique across NATed clients; that approximation is accepted.
/// Identities that carry no usable information map to a fixed sentinel
/// rather than being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    /// Sentinel value used when no usable client identity is available.
    pub const UNKNOWN: &'static str = "unknown";

    /// Create a key from an identity string.
    ///
    /// Surrounding whitespace is stripped; an empty or blank identity yields
    /// the sentinel key.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::unknown()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The sentinel key for requests without a usable identity.
    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    /// View the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
