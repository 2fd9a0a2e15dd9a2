use groupauthz_core::{AuthzRequest, RequirementType};

use super::{AuthorizationMechanism, DenialReason, Verdict};

/// Handles `require valid-user` and `require user name...`.
///
/// Meant to sit at the end of the chain: it permits any authenticated user for
/// `valid-user` and the listed users for `user`. A user rule that lists
/// nobody matching is a final denial. Other requirement types are left alone.
#[derive(Debug, Clone, Default)]
pub struct RequireUserMechanism;

impl AuthorizationMechanism for RequireUserMechanism {
    fn name(&self) -> &'static str {
        "require-user"
    }

    fn check(&self, request: &AuthzRequest<'_>) -> Verdict {
        let mut saw_user_rule = false;

        for rule in request
            .rules
            .iter()
            .filter(|rule| rule.applies_to(request.method))
        {
            match rule.requirement_type() {
                RequirementType::ValidUser => return Verdict::Allow,
                RequirementType::User => {
                    saw_user_rule = true;
                    if rule.arguments().iter().any(|name| name == request.user) {
                        return Verdict::Allow;
                    }
                }
                _ => {}
            }
        }

        if saw_user_rule {
            Verdict::Deny(DenialReason::UserNotAllowed)
        } else {
            Verdict::Decline
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupauthz_core::{GroupFileConfig, Method, MethodMask, Rule};

    fn check(user: &str, lines: &[&str]) -> Verdict {
        let rules: Vec<Rule> = lines
            .iter()
            .map(|line| Rule::parse(MethodMask::ALL, line).unwrap())
            .collect();
        let config = GroupFileConfig::default();
        RequireUserMechanism.check(&AuthzRequest {
            user,
            method: Method::Get,
            resource: "/private",
            rules: &rules,
            config: &config,
        })
    }

    #[test]
    fn test_valid_user_permits_anyone() {
        assert_eq!(check("alice", &["valid-user"]), Verdict::Allow);
    }

    #[test]
    fn test_listed_user_is_permitted() {
        assert_eq!(check("bob", &["user alice bob"]), Verdict::Allow);
        assert_eq!(
            check("carol", &["user alice bob"]),
            Verdict::Deny(DenialReason::UserNotAllowed)
        );
    }

    #[test]
    fn test_any_matching_user_rule_permits() {
        let lines = ["user alice", "user carol"];
        assert_eq!(check("carol", &lines), Verdict::Allow);
    }

    #[test]
    fn test_group_rules_are_declined() {
        assert_eq!(check("alice", &["group staff"]), Verdict::Decline);
    }
}
