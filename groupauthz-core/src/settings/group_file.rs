use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DBM_TYPE: &str = "default";

fn default_dbm_type() -> String {
    DEFAULT_DBM_TYPE.to_string()
}

fn default_authoritative() -> bool {
    true
}

/// Group file settings of one protected resource.
///
/// Built once per resource scope and shared read-only by every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[readonly::make]
pub struct GroupFileConfig {
    #[serde(default)]
    pub group_file: Option<PathBuf>,
    #[serde(default = "default_dbm_type")]
    pub dbm_type: String,
    /// When false, a user unknown to the group file is left to the next
    /// authorization mechanism instead of being rejected.
    #[serde(default = "default_authoritative")]
    pub authoritative: bool,
}

impl Default for GroupFileConfig {
    fn default() -> Self {
        Self {
            group_file: None,
            dbm_type: default_dbm_type(),
            authoritative: default_authoritative(),
        }
    }
}

impl GroupFileConfig {
    pub fn new(group_file: impl Into<PathBuf>) -> Self {
        Self {
            group_file: Some(group_file.into()),
            ..Default::default()
        }
    }

    pub fn with_dbm_type(mut self, dbm_type: impl Into<String>) -> Self {
        self.dbm_type = dbm_type.into();
        self
    }

    pub fn with_authoritative(mut self, authoritative: bool) -> Self {
        self.authoritative = authoritative;
        self
    }

    pub fn group_file_path(&self) -> Option<&Path> {
        self.group_file.as_deref()
    }
}
