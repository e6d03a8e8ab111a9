use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Identity of a logical command.
///
/// Every invocation executed under the same key shares one circuit breaker,
/// one bulkhead and one rolling metric stream. Keys are cheap to clone and
/// never change once created.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey(Arc<str>);

impl CommandKey {
    /// Creates a key from any string-like value.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CommandKey").field(&&*self.0).finish()
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommandKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CommandKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&CommandKey> for CommandKey {
    fn from(key: &CommandKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for CommandKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CommandKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CommandKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
