use std::fmt;
use url::Url;

/// An egress path for requests
///
/// `Direct` is an explicit marker for "no proxy", so the rotation logic treats it like any
/// other candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProxyDescriptor {
    /// Connect to the target directly
    Direct,

    /// Connect through the proxy at this address
    Via(Url),
}

impl ProxyDescriptor {
    /// Returns the proxy address, if any
    pub fn address(&self) -> Option<&Url> {
        match self {
            Self::Direct => None,
            Self::Via(url) => Some(url),
        }
    }

    /// Returns true for the no-proxy marker
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Via(url) => write!(f, "{}", url),
        }
    }
}
