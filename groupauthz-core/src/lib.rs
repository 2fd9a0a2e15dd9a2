//! Group membership authorization backed by DBM-style key-value stores.
//!
//! The crate answers one question: may an already authenticated user access a
//! resource guarded by `require group ...` rules? Group lists are looked up
//! per request in a key-value file keyed by username, see [`group_store`]
//! for the record format and [`engine`] for the decision logic.

pub mod engine;
pub mod group_store;
pub mod rule;
pub mod settings;
pub mod store;

pub use engine::{AuthorizationEngine, AuthzRequest, Decision, DenyReason, ErrorKind};
pub use group_store::{EntryError, GroupEntry, GroupRecord, GroupStore};
pub use rule::{Method, MethodMask, RequirementType, Rule, RuleParseError};
pub use settings::group_file::GroupFileConfig;
pub use store::{KeyEncoding, StoreError, StoreRegistry};
