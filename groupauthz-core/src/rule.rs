use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("Empty require line")]
    EmptyRequirement,

    #[error("Unknown HTTP method: {0}")]
    UnknownMethod(String),
}

/// HTTP methods a rule can be limited to.
///
/// `HEAD` is folded into [`Method::Get`]; any method without a variant of its
/// own is [`Method::Other`] and is only covered by rules limited to all methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Propfind,
    Proppatch,
    Mkcol,
    Copy,
    Move,
    Lock,
    Unlock,
    Other,
}

impl Method {
    pub fn all() -> Vec<Method> {
        vec![
            Method::Get,
            Method::Put,
            Method::Post,
            Method::Delete,
            Method::Connect,
            Method::Options,
            Method::Trace,
            Method::Patch,
            Method::Propfind,
            Method::Proppatch,
            Method::Mkcol,
            Method::Copy,
            Method::Move,
            Method::Lock,
            Method::Unlock,
            Method::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Propfind => "PROPFIND",
            Method::Proppatch => "PROPPATCH",
            Method::Mkcol => "MKCOL",
            Method::Copy => "COPY",
            Method::Move => "MOVE",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Other => "*",
        }
    }

    /// Map a request method name onto a variant, never failing.
    pub fn from_request_method(name: &str) -> Method {
        match name.parse::<Method>() {
            Ok(method) => method,
            Err(_) => Method::Other,
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl FromStr for Method {
    type Err = RuleParseError;

    /// Parse a method name as used in configuration. Names are case-sensitive
    /// like on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" | "HEAD" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "PATCH" => Ok(Method::Patch),
            "PROPFIND" => Ok(Method::Propfind),
            "PROPPATCH" => Ok(Method::Proppatch),
            "MKCOL" => Ok(Method::Mkcol),
            "COPY" => Ok(Method::Copy),
            "MOVE" => Ok(Method::Move),
            "LOCK" => Ok(Method::Lock),
            "UNLOCK" => Ok(Method::Unlock),
            _ => Err(RuleParseError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of methods a rule applies to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodMask(u32);

impl MethodMask {
    pub const ALL: MethodMask = MethodMask(u32::MAX);

    pub fn empty() -> Self {
        MethodMask(0)
    }

    pub fn only(methods: &[Method]) -> Self {
        methods.iter().fold(Self::empty(), |mask, m| mask.with(*m))
    }

    /// Parse a list of method names. An empty list means every method.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, RuleParseError> {
        if names.is_empty() {
            return Ok(Self::ALL);
        }
        names.iter().try_fold(Self::empty(), |mask, name| {
            Ok(mask.with(name.as_ref().parse::<Method>()?))
        })
    }

    pub fn with(self, method: Method) -> Self {
        MethodMask(self.0 | method.bit())
    }

    pub fn contains(&self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for MethodMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for MethodMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return f.write_str("MethodMask(*)");
        }
        let names: Vec<&str> = Method::all()
            .into_iter()
            .filter(|m| self.contains(*m))
            .map(|m| m.as_str())
            .collect();
        write!(f, "MethodMask({})", names.join("|"))
    }
}

/// The first word of a require line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementType {
    Group,
    User,
    ValidUser,
    Other(String),
}

impl RequirementType {
    pub fn parse(word: &str) -> Self {
        match word {
            "group" => RequirementType::Group,
            "user" => RequirementType::User,
            "valid-user" => RequirementType::ValidUser,
            other => RequirementType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RequirementType::Group => "group",
            RequirementType::User => "user",
            RequirementType::ValidUser => "valid-user",
            RequirementType::Other(word) => word,
        }
    }
}

/// One configured `require ...` line, limited to a set of methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    method_mask: MethodMask,
    requirement_type: RequirementType,
    arguments: Vec<String>,
}

impl Rule {
    pub fn new(
        method_mask: MethodMask,
        requirement_type: RequirementType,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            method_mask,
            requirement_type,
            arguments,
        }
    }

    /// Shorthand for a `require group ...` rule.
    pub fn group<I, S>(method_mask: MethodMask, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            method_mask,
            RequirementType::Group,
            groups.into_iter().map(Into::into).collect(),
        )
    }

    /// Parse the text following `require`, e.g. `group admins editors`.
    ///
    /// Words are separated by whitespace; the first word is the requirement
    /// type and the remaining words are its arguments.
    pub fn parse(method_mask: MethodMask, line: &str) -> Result<Self, RuleParseError> {
        let mut words = line.split_whitespace();
        let first = words.next().ok_or(RuleParseError::EmptyRequirement)?;
        Ok(Self::new(
            method_mask,
            RequirementType::parse(first),
            words.map(str::to_string).collect(),
        ))
    }

    pub fn method_mask(&self) -> MethodMask {
        self.method_mask
    }

    pub fn requirement_type(&self) -> &RequirementType {
        &self.requirement_type
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Group names of a `require group` rule, `None` for any other type.
    pub fn group_names(&self) -> Option<&[String]> {
        match self.requirement_type {
            RequirementType::Group => Some(&self.arguments),
            _ => None,
        }
    }

    pub fn applies_to(&self, method: Method) -> bool {
        self.method_mask.contains(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_rule() {
        let line = "group  admins\teditors ";
        let rule = Rule::parse(MethodMask::ALL, line).unwrap();
        assert_eq!(rule.requirement_type(), &RequirementType::Group);
        assert_eq!(
            rule.group_names(),
            Some(&["admins".to_string(), "editors".to_string()][..])
        );
    }

    #[test]
    fn test_parse_other_rule_has_no_group_names() {
        let rule = Rule::parse(MethodMask::ALL, "valid-user").unwrap();
        assert_eq!(rule.requirement_type(), &RequirementType::ValidUser);
        assert!(rule.group_names().is_none());

        let line = "ldap-attribute dept=sales";
        let rule = Rule::parse(MethodMask::ALL, line).unwrap();
        assert_eq!(
            rule.requirement_type(),
            &RequirementType::Other("ldap-attribute".to_string())
        );
    }

    #[test]
    fn test_parse_empty_line_fails() {
        assert_eq!(
            Rule::parse(MethodMask::ALL, "   "),
            Err(RuleParseError::EmptyRequirement)
        );
    }

    #[test]
    fn test_group_keyword_is_case_sensitive() {
        let rule = Rule::parse(MethodMask::ALL, "Group admins").unwrap();
        assert!(rule.group_names().is_none());
    }

    #[test]
    fn test_method_mask_limits_methods() {
        let mask = MethodMask::parse(&["POST", "PUT"]).unwrap();
        assert!(mask.contains(Method::Post));
        assert!(mask.contains(Method::Put));
        assert!(!mask.contains(Method::Get));
        assert!(!mask.contains(Method::Other));
    }

    #[test]
    fn test_empty_method_list_means_all() {
        let mask = MethodMask::parse::<&str>(&[]).unwrap();
        assert_eq!(mask, MethodMask::ALL);
        for method in Method::all() {
            assert!(mask.contains(method), "{method} should be covered");
        }
    }

    #[test]
    fn test_unknown_method_is_rejected_in_config() {
        assert_eq!(
            MethodMask::parse(&["GET", "FETCH"]),
            Err(RuleParseError::UnknownMethod("FETCH".to_string()))
        );
    }

    #[test]
    fn test_head_is_treated_as_get() {
        assert_eq!(Method::from_request_method("HEAD"), Method::Get);
        assert_eq!(Method::from_request_method("REPORT"), Method::Other);
    }
}
