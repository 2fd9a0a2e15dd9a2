use groupauthz_core::{AuthorizationEngine, AuthzRequest};

use super::{AuthorizationMechanism, Verdict};

/// `require group` checks against the resource's group file.
#[derive(Debug, Clone, Default)]
pub struct DbmGroupMechanism {
    engine: AuthorizationEngine,
}

impl DbmGroupMechanism {
    pub fn new(engine: AuthorizationEngine) -> Self {
        Self { engine }
    }
}

impl AuthorizationMechanism for DbmGroupMechanism {
    fn name(&self) -> &'static str {
        "dbm-group"
    }

    fn check(&self, request: &AuthzRequest<'_>) -> Verdict {
        self.engine.authorize(request).into()
    }
}
