//! Common types used throughout Xela.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use crate::{Error, Result};

/// A `/`-separated location inside a storage backend or vault.
///
/// Components are validated on construction, so a `VaultPath` never
/// contains empty components, separators, NUL bytes or `.`/`..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VaultPath {
    components: Vec<String>,
}

impl VaultPath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Validate a single path component.
    ///
    /// # Errors
    /// - Empty component
    /// - Component containing `/`, `\` or NUL
    /// - `.` or `..`
    pub fn validate_component(component: &str) -> Result<()> {
        if component.is_empty() {
            return Err(Error::InvalidInput(
                "Path component cannot be empty".to_string(),
            ));
        }
        if component.contains(&['/', '\\', '\0'][..]) {
            return Err(Error::InvalidInput(format!(
                "Path component cannot contain separators: {:?}",
                component
            )));
        }
        if component == "." || component == ".." {
            return Err(Error::InvalidInput(format!(
                "Path component cannot be {:?}",
                component
            )));
        }
        Ok(())
    }

    /// Create a path from string components.
    ///
    /// # Errors
    /// - Returns error if any component is invalid
    pub fn from_components(components: Vec<String>) -> Result<Self> {
        for comp in &components {
            Self::validate_component(comp)?;
        }
        Ok(Self { components })
    }

    /// Parse a path string. Leading and trailing `/` are ignored.
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Ok(Self::root());
        }

        let components: Vec<String> = path.split('/').map(String::from).collect();
        Self::from_components(components)
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut components = self.components.clone();
        components.pop();
        Some(Self { components })
    }

    /// Last component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Join this path with a child component.
    pub fn join(&self, child: &str) -> Result<Self> {
        Self::validate_component(child)?;
        let mut components = self.components.clone();
        components.push(child.to_string());
        Ok(Self { components })
    }

    /// Check whether `self` is the direct parent of `other`.
    pub fn is_parent_of(&self, other: &VaultPath) -> bool {
        other.components.len() == self.components.len() + 1
            && other.components.starts_with(&self.components)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Convert to a string representation.
    pub fn to_string_path(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }
}

impl fmt::Display for VaultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}

/// Sensitive data wrapper that zeroizes on drop.
///
/// Used for passwords on their way into key derivation.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for SensitiveBytes {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for SensitiveBytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl PartialEq for SensitiveBytes {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vault_path_root() {
        let path = VaultPath::root();
        assert!(path.is_root());
        assert_eq!(path.name(), None);
        assert_eq!(path.to_string_path(), "/");
        assert_eq!(VaultPath::parse("///").unwrap(), path);
    }

    #[test]
    fn test_vault_path_parse() {
        let path = VaultPath::parse("/foo/bar/baz/").unwrap();
        assert_eq!(path.components(), &["foo", "bar", "baz"]);
        assert_eq!(path.to_string_path(), "/foo/bar/baz");
    }

    #[test]
    fn test_vault_path_rejects_dot_components() {
        assert!(VaultPath::parse("/foo/../bar").is_err());
        assert!(VaultPath::parse("/foo//bar").is_err());
        assert!(VaultPath::root().join(".").is_err());
        assert!(VaultPath::root().join("a\0b").is_err());
    }

    #[test]
    fn test_vault_path_parent_and_join() {
        let path = VaultPath::root().join("foo").unwrap().join("bar").unwrap();
        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string_path(), "/foo");
        assert!(parent.is_parent_of(&path));
        assert!(!VaultPath::root().is_parent_of(&path));
        assert_eq!(path.name(), Some("bar"));
    }

    #[test]
    fn test_sensitive_bytes_redacted() {
        let secret = SensitiveBytes::from("hunter2".to_string());
        assert_eq!(secret.len(), 7);
        assert_eq!(format!("{:?}", secret), "SensitiveBytes([REDACTED; 7 bytes])");
    }

    proptest! {
        #[test]
        fn prop_parse_display_roundtrip(parts in prop::collection::vec("[a-zA-Z0-9_-]{1,12}", 0..6)) {
            let path = VaultPath::from_components(parts.clone()).unwrap();
            let reparsed = VaultPath::parse(&path.to_string_path()).unwrap();
            prop_assert_eq!(reparsed.components(), parts.as_slice());
        }
    }
}
