//! Ordered chain of authorization mechanisms.
//!
//! Every mechanism sees the same request and returns a [`Verdict`]. The chain
//! stops at the first terminal verdict; a declining mechanism hands the
//! request on to the next one.

pub mod dbm_group;
pub mod require_user;

use groupauthz_core::{AuthzRequest, Decision, DenyReason};
use serde::Serialize;
use tracing::{debug, error};

pub use dbm_group::DbmGroupMechanism;
pub use require_user::RequireUserMechanism;

/// Why a mechanism refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    UserNotInGroupFile,
    UserNotInRequiredGroup,
    /// None of the users listed by a `require user` rule.
    UserNotAllowed,
}

impl From<DenyReason> for DenialReason {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::UserNotInGroupFile => DenialReason::UserNotInGroupFile,
            DenyReason::UserNotInRequiredGroup => DenialReason::UserNotInRequiredGroup,
        }
    }
}

/// What a single mechanism says about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenialReason),
    /// Leave the request to the next mechanism.
    Decline,
    Fail(String),
}

impl From<Decision> for Verdict {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Permit => Verdict::Allow,
            Decision::DenyFinal { reason } => Verdict::Deny(reason.into()),
            Decision::DenyPassthrough | Decision::NotApplicable => Verdict::Decline,
            Decision::Error { detail, .. } => Verdict::Fail(detail),
        }
    }
}

pub trait AuthorizationMechanism: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, request: &AuthzRequest<'_>) -> Verdict;
}

/// Result of running a request through the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChainOutcome {
    /// No rule covers the request method, nothing to check.
    Unrestricted,
    Allowed {
        mechanism: &'static str,
    },
    Unauthorized {
        mechanism: &'static str,
        reason: DenialReason,
    },
    Failed {
        mechanism: &'static str,
        detail: String,
    },
    /// Rules apply but every mechanism declined.
    Undecided,
}

#[derive(Default)]
pub struct AuthorizationChain {
    mechanisms: Vec<Box<dyn AuthorizationMechanism>>,
}

impl AuthorizationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<M: AuthorizationMechanism + 'static>(mut self, mechanism: M) -> Self {
        self.mechanisms.push(Box::new(mechanism));
        self
    }

    pub fn mechanism_names(&self) -> Vec<&'static str> {
        self.mechanisms.iter().map(|m| m.name()).collect()
    }

    pub fn evaluate(&self, request: &AuthzRequest<'_>) -> ChainOutcome {
        if !request
            .rules
            .iter()
            .any(|rule| rule.applies_to(request.method))
        {
            return ChainOutcome::Unrestricted;
        }

        for mechanism in &self.mechanisms {
            let verdict = mechanism.check(request);
            debug!(
                "Mechanism {} decided {:?} for user {} on {}",
                mechanism.name(),
                verdict,
                request.user,
                request.resource
            );
            match verdict {
                Verdict::Allow => {
                    return ChainOutcome::Allowed {
                        mechanism: mechanism.name(),
                    }
                }
                Verdict::Deny(reason) => {
                    return ChainOutcome::Unauthorized {
                        mechanism: mechanism.name(),
                        reason,
                    }
                }
                Verdict::Fail(detail) => {
                    return ChainOutcome::Failed {
                        mechanism: mechanism.name(),
                        detail,
                    }
                }
                Verdict::Decline => continue,
            }
        }

        error!(
            "Configuration error: could not check access to {} for user {}, no mechanism decided",
            request.resource, request.user
        );
        ChainOutcome::Undecided
    }
}

impl std::fmt::Debug for AuthorizationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationChain")
            .field("mechanisms", &self.mechanism_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupauthz_core::{ErrorKind, GroupFileConfig, Method, MethodMask, Rule};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        verdict: Verdict,
        calls: Arc<AtomicUsize>,
    }

    impl AuthorizationMechanism for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn check(&self, _request: &AuthzRequest<'_>) -> Verdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    fn fixed(name: &'static str, verdict: Verdict) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Fixed {
                name,
                verdict,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn run(chain: &AuthorizationChain, rules: &[Rule]) -> ChainOutcome {
        let config = GroupFileConfig::default();
        chain.evaluate(&AuthzRequest {
            user: "alice",
            method: Method::Get,
            resource: "/private",
            rules,
            config: &config,
        })
    }

    fn group_rules() -> Vec<Rule> {
        vec![Rule::group(MethodMask::ALL, ["staff"])]
    }

    #[test]
    fn test_passthrough_moves_to_next_mechanism() {
        let (first, first_calls) = fixed("first", Verdict::Decline);
        let (second, second_calls) = fixed("second", Verdict::Allow);
        let chain = AuthorizationChain::new().with(first).with(second);

        assert_eq!(
            run(&chain, &group_rules()),
            ChainOutcome::Allowed {
                mechanism: "second",
            }
        );
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_final_denial_stops_chain() {
        let denial = Verdict::Deny(DenialReason::UserNotInRequiredGroup);
        let (first, _) = fixed("first", denial);
        let (second, second_calls) = fixed("second", Verdict::Allow);
        let chain = AuthorizationChain::new().with(first).with(second);

        assert_eq!(
            run(&chain, &group_rules()),
            ChainOutcome::Unauthorized {
                mechanism: "first",
                reason: DenialReason::UserNotInRequiredGroup,
            }
        );
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_stops_chain() {
        let (first, _) = fixed("first", Verdict::Fail("boom".to_string()));
        let (second, second_calls) = fixed("second", Verdict::Allow);
        let chain = AuthorizationChain::new().with(first).with(second);

        assert_eq!(
            run(&chain, &group_rules()),
            ChainOutcome::Failed {
                mechanism: "first",
                detail: "boom".to_string(),
            }
        );
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_declined_is_undecided() {
        let (first, _) = fixed("first", Verdict::Decline);
        let (second, _) = fixed("second", Verdict::Decline);
        let chain = AuthorizationChain::new().with(first).with(second);

        assert_eq!(run(&chain, &group_rules()), ChainOutcome::Undecided);
    }

    #[test]
    fn test_no_rule_for_method_skips_chain() {
        let (first, first_calls) = fixed("first", Verdict::Allow);
        let chain = AuthorizationChain::new().with(first);

        let rules = vec![Rule::group(MethodMask::only(&[Method::Post]), ["staff"])];
        assert_eq!(run(&chain, &rules), ChainOutcome::Unrestricted);
        assert_eq!(run(&chain, &[]), ChainOutcome::Unrestricted);
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_engine_decisions_map_to_verdicts() {
        assert_eq!(Verdict::from(Decision::Permit), Verdict::Allow);
        assert_eq!(Verdict::from(Decision::DenyPassthrough), Verdict::Decline);
        assert_eq!(Verdict::from(Decision::NotApplicable), Verdict::Decline);
        assert_eq!(
            Verdict::from(Decision::DenyFinal {
                reason: DenyReason::UserNotInGroupFile,
            }),
            Verdict::Deny(DenialReason::UserNotInGroupFile)
        );
        assert_eq!(
            Verdict::from(Decision::Error {
                kind: ErrorKind::LookupFailed,
                detail: "boom".to_string(),
            }),
            Verdict::Fail("boom".to_string())
        );
    }
}
