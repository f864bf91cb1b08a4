use std::str::FromStr;

/// Identifier of a queue entry
///
/// A ULID assigned by the store the first time an entry is saved. It doubles
/// as the on-disk filename for file-backed stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId {
    id: ulid::Ulid,
}

impl EntryId {
    /// Generate a new unique entry ID
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Parse an entry ID from a spool filename like `01ARZ3NDEKTSV4RRFFQ69G5FAV.bin`
    ///
    /// Rejects path separators, `..` and anything that is not a ULID, so a
    /// directory listing can never be turned into a path outside the spool.
    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(".bin")?;
        stem.parse().ok()
    }

    /// Filename used by file-backed stores
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}.bin", self.id)
    }
}

impl FromStr for EntryId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(Self::new)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl serde::Serialize for EntryId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_validation() {
        assert!(EntryId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_some());

        assert!(EntryId::from_filename("../etc/passwd.bin").is_none());
        assert!(EntryId::from_filename("foo/bar.bin").is_none());
        assert!(EntryId::from_filename("..\\windows\\system32.bin").is_none());

        assert!(EntryId::from_filename("not_a_valid_ulid.bin").is_none());
        assert!(EntryId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin.tmp").is_none());
        assert!(EntryId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.json").is_none());
    }

    #[test]
    fn test_filename_round_trip() {
        let id = EntryId::generate();
        assert_eq!(EntryId::from_filename(&id.filename()), Some(id));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<EntryId>().is_err());
        assert!("61a8c3f2e4b0".parse::<EntryId>().is_err());
        assert!("01ARZ3NDEKTSV4RRFFQ69G5FAV".parse::<EntryId>().is_ok());
    }
}
