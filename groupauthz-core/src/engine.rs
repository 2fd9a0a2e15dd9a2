//! The `require group` decision engine.
//!
//! For each request the engine picks the first `require group` rule that
//! applies to the request method, looks the user up in the resource's group
//! file and matches the required groups against the stored group list.
//!
//! | situation                               | decision                 |
//! |-----------------------------------------|--------------------------|
//! | no group file or no rules               | `NotApplicable`          |
//! | no `group` rule for the method          | `NotApplicable`          |
//! | group file cannot be opened or read     | `Error`                  |
//! | user unknown, or no groups stored       | `DenyFinal` if authoritative, else `DenyPassthrough` |
//! | any required group in the user's list   | `Permit`                 |
//! | user known but in none of the groups    | `DenyFinal`              |

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

use crate::group_store::{split_group_list, GroupStore};
use crate::rule::{Method, Rule};
use crate::settings::group_file::GroupFileConfig;
use crate::store::{StoreError, StoreRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The group file has no usable group list for the user.
    UserNotInGroupFile,
    /// The user is known but belongs to none of the required groups.
    UserNotInRequiredGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LookupFailed,
}

/// Outcome of one authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Permit,
    DenyFinal { reason: DenyReason },
    DenyPassthrough,
    /// The mechanism has nothing to say about this request.
    NotApplicable,
    Error { kind: ErrorKind, detail: String },
}

impl Decision {
    /// Permit, final denials and errors end the authorization chain.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Decision::Permit | Decision::DenyFinal { .. } | Decision::Error { .. }
        )
    }

    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

/// Everything the engine needs to know about one request.
#[derive(Debug, Clone, Copy)]
pub struct AuthzRequest<'a> {
    pub user: &'a str,
    pub method: Method,
    /// Used for log messages only.
    pub resource: &'a str,
    pub rules: &'a [Rule],
    pub config: &'a GroupFileConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationEngine {
    store: GroupStore,
}

impl AuthorizationEngine {
    pub fn new(registry: Arc<StoreRegistry>) -> Self {
        Self {
            store: GroupStore::new(registry),
        }
    }

    pub fn from_store(store: GroupStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    pub fn authorize(&self, request: &AuthzRequest<'_>) -> Decision {
        let config = request.config;
        let Some(group_file) = config.group_file_path() else {
            return Decision::NotApplicable;
        };
        if request.rules.is_empty() {
            return Decision::NotApplicable;
        }

        let Some(required) = select_group_rule(request.rules, request.method) else {
            return Decision::NotApplicable;
        };

        let groups = match self
            .store
            .lookup_groups(request.user, group_file, &config.dbm_type)
        {
            Ok(groups) => groups,
            Err(e) => {
                log_store_error(&e, group_file);
                return Decision::Error {
                    kind: ErrorKind::LookupFailed,
                    detail: e.to_string(),
                };
            }
        };

        // An empty group field is handled like a user missing from the file.
        let groups = match groups {
            Some(groups) if !groups.is_empty() => groups,
            _ => {
                if !config.authoritative {
                    debug!(
                        "User {} not in group file {}, passing on",
                        request.user,
                        group_file.display()
                    );
                    return Decision::DenyPassthrough;
                }
                error!(
                    "User {} not in group file {}: {}",
                    request.user,
                    group_file.display(),
                    request.resource
                );
                return Decision::DenyFinal {
                    reason: DenyReason::UserNotInGroupFile,
                };
            }
        };

        match first_matching_group(required, &groups) {
            Some(group) => {
                debug!(
                    "User {} granted access to {} via group {}",
                    request.user, request.resource, group
                );
                Decision::Permit
            }
            None => {
                error!(
                    "User {} not in right group: {}",
                    request.user, request.resource
                );
                Decision::DenyFinal {
                    reason: DenyReason::UserNotInRequiredGroup,
                }
            }
        }
    }
}

fn log_store_error(e: &StoreError, group_file: &Path) {
    let file = group_file.display();
    let store_type = e.store_type();
    match e {
        StoreError::UnknownStoreType { .. } => {
            error!("Unknown group file type {} for {}", store_type, file);
        }
        StoreError::OpenFailed { source, .. } => {
            error!(
                "Could not open group file (type {}) {}: {}",
                store_type, file, source
            );
        }
        StoreError::ReadFailed { source, .. } => {
            error!(
                "Could not read group file (type {}) {}: {}",
                store_type, file, source
            );
        }
    }
}

/// Group names of the first `require group` rule covering `method`.
///
/// Only this rule is evaluated, later `require group` lines are ignored.
fn select_group_rule(rules: &[Rule], method: Method) -> Option<&[String]> {
    rules
        .iter()
        .filter(|rule| rule.applies_to(method))
        .find_map(Rule::group_names)
}

fn first_matching_group<'a>(required: &'a [String], user_groups: &str) -> Option<&'a str> {
    required
        .iter()
        .map(String::as_str)
        .find(|wanted| split_group_list(user_groups).any(|group| group == *wanted))
}
