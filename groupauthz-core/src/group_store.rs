//! Group lookups and the group file record format.
//!
//! A group file maps usernames to a value in one of two layouts:
//!
//! ```text
//! key=username  value=groupname[,groupname...]
//! key=username  value=password:groupname[,groupname...][:anything]
//! ```
//!
//! The second layout lets the password file and the group file be the same
//! physical store. If the value contains a `:` the group list is the text
//! between the first and the second `:` (or the end of the value); everything
//! after a second `:` is ignored. A value without `:` is the group list itself.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::store::{value_to_string, StoreError, StoreRegistry};

/// The value stored for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    raw_value: String,
}

impl GroupRecord {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
        }
    }

    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// The comma-separated group list encoded in the value.
    pub fn group_list(&self) -> &str {
        decode_group_field(&self.raw_value)
    }

    /// Group names in stored order, empty names skipped.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        split_group_list(self.group_list())
    }
}

pub fn decode_group_field(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((_password, rest)) => rest.split_once(':').map_or(rest, |(groups, _)| groups),
        None => raw,
    }
}

pub fn split_group_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').filter(|group| !group.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("Invalid group name {name:?}: must be non-empty without ':', ',' or whitespace")]
    InvalidGroupName { name: String },

    #[error("Invalid password hash: must not contain ':'")]
    InvalidPasswordHash,

    #[error("Invalid comment: must not contain NUL bytes")]
    InvalidComment,
}

/// Builder for values in the combined `password:groups[:comment]` layout or
/// the plain group-only layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupEntry {
    pub password_hash: Option<String>,
    pub groups: Vec<String>,
    pub comment: Option<String>,
}

impl GroupEntry {
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Fails for fields that would decode to something else than what was
    /// given, and for group names no `require group` line can name.
    pub fn validate(&self) -> Result<(), EntryError> {
        if let Some(name) = self.groups.iter().find(|name| !is_valid_group_name(name)) {
            return Err(EntryError::InvalidGroupName { name: name.clone() });
        }
        let hash = self.password_hash.as_deref().unwrap_or_default();
        if hash.contains(':') || hash.contains('\0') {
            return Err(EntryError::InvalidPasswordHash);
        }
        if self.comment.as_deref().is_some_and(|c| c.contains('\0')) {
            return Err(EntryError::InvalidComment);
        }
        Ok(())
    }

    /// A comment forces the combined layout, with an empty password field if
    /// no hash is set.
    pub fn encode(&self) -> Result<String, EntryError> {
        self.validate()?;

        let groups = self.groups.join(",");
        let password = self.password_hash.as_deref().unwrap_or_default();
        let value = match (&self.password_hash, &self.comment) {
            (None, None) => groups,
            (Some(_), None) => format!("{password}:{groups}"),
            (_, Some(comment)) => format!("{password}:{groups}:{comment}"),
        };
        Ok(value)
    }
}

fn is_valid_group_name(name: &str) -> bool {
    let forbidden = |c: char| c == ':' || c == ',' || c == '\0' || c.is_whitespace();
    !name.is_empty() && !name.chars().any(forbidden)
}

/// Looks up a user's group list in a group file.
#[derive(Debug, Clone, Default)]
pub struct GroupStore {
    registry: Arc<StoreRegistry>,
}

impl GroupStore {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// Fetch the raw record for `username`; `Ok(None)` if the key is absent.
    ///
    /// The store is opened read-only for this single lookup and closed again
    /// before returning, on success and on failure.
    pub fn fetch_record(
        &self,
        username: &str,
        store_path: &Path,
        store_type: &str,
    ) -> Result<Option<GroupRecord>, StoreError> {
        let backend = self.registry.resolve(store_type)?;
        let key = backend.key_encoding().encode_key(username);

        let handle = backend
            .open_read_only(store_path)
            .map_err(|source| StoreError::open_failed(store_type, store_path, source))?;

        let raw = handle
            .fetch(&key)
            .map_err(|source| StoreError::read_failed(store_type, store_path, source))?;
        drop(handle);

        trace!(
            "Group lookup for {} in {}: {}",
            username,
            store_path.display(),
            if raw.is_some() { "found" } else { "absent" }
        );

        Ok(raw.map(|raw| GroupRecord::new(value_to_string(&raw))))
    }

    /// The decoded group list for `username`; `Ok(None)` if the key is absent.
    pub fn lookup_groups(
        &self,
        username: &str,
        store_path: &Path,
        store_type: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .fetch_record(username, store_path, store_type)?
            .map(|record| record.group_list().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyEncoding, MemoryBackend};
    use std::path::PathBuf;

    fn store_with(backend: MemoryBackend) -> GroupStore {
        let mut registry = StoreRegistry::empty();
        registry.register("memory", backend);
        GroupStore::new(Arc::new(registry))
    }

    #[test]
    fn test_decode_without_colon_is_whole_value() {
        assert_eq!(decode_group_field("staff,admins"), "staff,admins");
        assert_eq!(decode_group_field(""), "");
    }

    #[test]
    fn test_decode_single_colon_takes_rest() {
        assert_eq!(decode_group_field("xyz:staff,admins"), "staff,admins");
        assert_eq!(decode_group_field(":staff"), "staff");
        assert_eq!(decode_group_field("secret:"), "");
    }

    #[test]
    fn test_decode_two_colons_ignores_trailing_fields() {
        assert_eq!(
            decode_group_field("xyz:staff,admins:John Doe"),
            "staff,admins"
        );
        assert_eq!(decode_group_field("xyz:staff:also:more"), "staff");
        assert_eq!(decode_group_field("xyz::admins"), "");
    }

    #[test]
    fn test_decoded_list_never_contains_trailing_field() {
        for raw in ["a:b:c", "pw:g1,g2:c:d:e", "::x", "pw:g:", "p:g:admins,root"] {
            let decoded = decode_group_field(raw);
            let after_second = raw.splitn(3, ':').nth(2).unwrap();
            assert!(!decoded.contains(':'), "{raw} decoded to {decoded}");
            if !after_second.is_empty() {
                assert_ne!(decoded, after_second);
            }
        }
    }

    #[test]
    fn test_record_groups_skip_empty_names() {
        let record = GroupRecord::new("pw:staff,,admins,:comment");
        let groups: Vec<_> = record.groups().collect();
        assert_eq!(groups, vec!["staff", "admins"]);
        assert_eq!(record.raw_value(), "pw:staff,,admins,:comment");
    }

    #[test]
    fn test_entry_encoding() {
        let plain = GroupEntry::new(["staff", "admins"]);
        assert_eq!(plain.encode().unwrap(), "staff,admins");

        let with_hash = GroupEntry::new(["staff"]).with_password_hash("$apr1$x");
        assert_eq!(with_hash.encode().unwrap(), "$apr1$x:staff");

        let with_comment = GroupEntry::new(["staff"]).with_comment("Jane: night shift");
        assert_eq!(with_comment.encode().unwrap(), ":staff:Jane: night shift");
    }

    #[test]
    fn test_encoded_entries_decode_to_their_groups() {
        let entry = GroupEntry::new(["staff", "admins"])
            .with_password_hash("hash")
            .with_comment("note");
        let value = entry.encode().unwrap();
        assert_eq!(decode_group_field(&value), "staff,admins");
    }

    #[test]
    fn test_entry_rejects_group_names_that_do_not_survive_decoding() {
        for name in ["ops:night", "staff,admins", "night shift", "", "tab\there"] {
            let entry = GroupEntry::new(["staff", name]);
            assert_eq!(
                entry.encode(),
                Err(EntryError::InvalidGroupName {
                    name: name.to_string(),
                }),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_entry_rejects_colon_in_password_hash() {
        let entry = GroupEntry::new(["staff"]).with_password_hash("a:b");
        assert_eq!(entry.encode(), Err(EntryError::InvalidPasswordHash));
    }

    #[test]
    fn test_entry_rejects_nul_in_comment() {
        let entry = GroupEntry::new(["staff"]).with_comment("a\0b");
        assert_eq!(entry.encode(), Err(EntryError::InvalidComment));
    }

    #[test]
    fn test_lookup_absent_user() {
        let store = store_with(MemoryBackend::with_entries(
            KeyEncoding::Plain,
            [("alice", "staff")],
        ));
        let groups = store
            .lookup_groups("bob", &PathBuf::from("/unused"), "memory")
            .unwrap();
        assert_eq!(groups, None);
    }

    #[test]
    fn test_lookup_present_user_decodes_value() {
        let store = store_with(MemoryBackend::with_entries(
            KeyEncoding::Plain,
            [("alice", "pw:staff,admins:Alice")],
        ));
        let groups = store
            .lookup_groups("alice", &PathBuf::from("/unused"), "MEMORY")
            .unwrap();
        assert_eq!(groups.as_deref(), Some("staff,admins"));
    }

    #[test]
    fn test_lookup_uses_backend_key_encoding() {
        let backend = MemoryBackend::with_entries(KeyEncoding::NulTerminated, [("alice", "staff")]);
        let store = store_with(backend);
        let groups = store
            .lookup_groups("alice", &PathBuf::from("/unused"), "memory")
            .unwrap();
        assert_eq!(groups.as_deref(), Some("staff"));
    }

    #[test]
    fn test_lookup_releases_handle() {
        let backend = MemoryBackend::with_entries(KeyEncoding::Plain, [("alice", "staff")]);
        let store = store_with(backend.clone());

        store
            .lookup_groups("alice", &PathBuf::from("/unused"), "memory")
            .unwrap();
        store
            .lookup_groups("bob", &PathBuf::from("/unused"), "memory")
            .unwrap();

        assert_eq!(backend.opened_total(), 2);
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn test_lookup_unknown_store_type() {
        let store = store_with(MemoryBackend::default());
        let err = store
            .lookup_groups("alice", &PathBuf::from("/unused"), "gdbm")
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownStoreType { .. }));
    }
}
