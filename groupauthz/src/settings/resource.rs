use groupauthz_core::{GroupFileConfig, MethodMask, Rule, RuleParseError};
use serde::Deserialize;

/// One `require ...` line, optionally limited to some methods.
#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct RequireSettings {
    /// Empty means every method.
    #[serde(default)]
    pub methods: Vec<String>,
    pub line: String,
}

/// A protected path prefix and its group file settings.
#[derive(Debug, Deserialize, Clone)]
#[readonly::make]
pub struct ResourceSettings {
    pub path: String,
    /// `group_file`, `dbm_type` and `authoritative` sit next to `path`.
    #[serde(flatten)]
    pub config: GroupFileConfig,
    #[serde(default)]
    pub require: Vec<RequireSettings>,
}

impl ResourceSettings {
    pub fn build(&self) -> Result<ProtectedResource, RuleParseError> {
        let rules = self
            .require
            .iter()
            .map(|require| Rule::parse(MethodMask::parse(&require.methods)?, &require.line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProtectedResource {
            path: normalize_prefix(&self.path),
            config: self.config.clone(),
            rules,
        })
    }
}

/// Immutable per-resource scope handed to every request under `path`.
#[derive(Debug, Clone)]
pub struct ProtectedResource {
    pub path: String,
    pub config: GroupFileConfig,
    pub rules: Vec<Rule>,
}

impl ProtectedResource {
    /// Matches whole path segments, `/docs` covers `/docs/a` but not `/docsx`.
    pub fn covers(&self, request_path: &str) -> bool {
        if self.path == "/" {
            return true;
        }
        match request_path.strip_prefix(&self.path) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

fn normalize_prefix(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupauthz_core::{Method, RequirementType};

    fn resource(path: &str) -> ProtectedResource {
        ProtectedResource {
            path: normalize_prefix(path),
            config: GroupFileConfig::default(),
            rules: vec![],
        }
    }

    #[test]
    fn test_prefix_matches_whole_segments() {
        let docs = resource("/docs/");
        assert!(docs.covers("/docs"));
        assert!(docs.covers("/docs/"));
        assert!(docs.covers("/docs/a/b.html"));
        assert!(!docs.covers("/docsx"));
        assert!(!docs.covers("/"));
    }

    #[test]
    fn test_root_covers_everything() {
        let root = resource("");
        assert_eq!(root.path, "/");
        assert!(root.covers("/anything"));
    }

    #[test]
    fn test_build_parses_require_lines() {
        let settings: ResourceSettings = serde_json::from_value(serde_json::json!({
            "path": "/private/",
            "group_file": "/srv/groups.db",
            "require": [
                { "line": "group staff admins" },
                { "methods": ["POST", "PUT"], "line": "valid-user" },
            ],
        }))
        .unwrap();

        let resource = settings.build().unwrap();
        assert_eq!(resource.path, "/private");
        assert_eq!(resource.config, GroupFileConfig::new("/srv/groups.db"));
        assert_eq!(resource.rules.len(), 2);
        assert_eq!(
            resource.rules[0].requirement_type(),
            &RequirementType::Group
        );
        assert!(resource.rules[0].applies_to(Method::Delete));
        assert!(resource.rules[1].applies_to(Method::Put));
        assert!(!resource.rules[1].applies_to(Method::Get));
    }

    #[test]
    fn test_group_file_settings_sit_next_to_path() {
        let settings: ResourceSettings = serde_json::from_value(serde_json::json!({
            "path": "/team",
            "group_file": "/srv/team.db",
            "dbm_type": "netscape",
            "authoritative": false,
        }))
        .unwrap();

        let expected = GroupFileConfig::new("/srv/team.db")
            .with_dbm_type("netscape")
            .with_authoritative(false);
        assert_eq!(settings.config, expected);
        assert!(settings.require.is_empty());
    }

    #[test]
    fn test_missing_group_file_settings_use_defaults() {
        let settings: ResourceSettings = serde_json::from_value(serde_json::json!({
            "path": "/open",
        }))
        .unwrap();
        assert_eq!(settings.config, GroupFileConfig::default());
    }

    #[test]
    fn test_build_rejects_unknown_method() {
        let settings: ResourceSettings = serde_json::from_value(serde_json::json!({
            "path": "/private",
            "require": [{ "methods": ["FETCH"], "line": "group staff" }],
        }))
        .unwrap();
        assert_eq!(
            settings.build().unwrap_err(),
            RuleParseError::UnknownMethod("FETCH".to_string())
        );
    }

    #[test]
    fn test_normalize_adds_leading_slash() {
        assert_eq!(normalize_prefix("private"), "/private");
    }
}
