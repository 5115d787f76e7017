//! Rule language for usage-logging policies.
//!
//! A policy is plain text, one rule per line. Each line compiles into an
//! immutable [`HttpRule`]; a complete policy compiles into a
//! [`RuleSet`](ruleset::RuleSet) that decides whether and how each message is
//! transmitted.
//!
//! * `compiler`: line parser, delimited literals, regex compilation.
//! * `defaults`: canned `include` bodies and the [`DefaultRules`](defaults::DefaultRules) holder.
//! * `ruleset`: the compiled policy and its filtering pipeline.

use std::fmt;

use regex::Regex;

pub mod compiler;
pub mod defaults;
pub mod ruleset;

/// The closed set of rule operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    AllowHttpUrl,
    CopySessionField,
    Remove,
    RemoveIf,
    RemoveIfFound,
    RemoveUnless,
    RemoveUnlessFound,
    Replace,
    Sample,
    SkipCompression,
    SkipSubmission,
    Stop,
    StopIf,
    StopIfFound,
    StopUnless,
    StopUnlessFound,
}

impl Verb {
    pub const ALL: [Verb; 16] = [
        Verb::AllowHttpUrl,
        Verb::CopySessionField,
        Verb::Remove,
        Verb::RemoveIf,
        Verb::RemoveIfFound,
        Verb::RemoveUnless,
        Verb::RemoveUnlessFound,
        Verb::Replace,
        Verb::Sample,
        Verb::SkipCompression,
        Verb::SkipSubmission,
        Verb::Stop,
        Verb::StopIf,
        Verb::StopIfFound,
        Verb::StopUnless,
        Verb::StopUnlessFound,
    ];

    /// Keyword used for this verb in rule text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::AllowHttpUrl => "allow_http_url",
            Verb::CopySessionField => "copy_session_field",
            Verb::Remove => "remove",
            Verb::RemoveIf => "remove_if",
            Verb::RemoveIfFound => "remove_if_found",
            Verb::RemoveUnless => "remove_unless",
            Verb::RemoveUnlessFound => "remove_unless_found",
            Verb::Replace => "replace",
            Verb::Sample => "sample",
            Verb::SkipCompression => "skip_compression",
            Verb::SkipSubmission => "skip_submission",
            Verb::Stop => "stop",
            Verb::StopIf => "stop_if",
            Verb::StopIfFound => "stop_if_found",
            Verb::StopUnless => "stop_unless",
            Verb::StopUnlessFound => "stop_unless_found",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First parameter of a rule: a compiled pattern, a sample percentage, or nothing.
#[derive(Debug, Clone)]
pub enum RuleParam {
    None,
    Pattern(Regex),
    Percent(u8),
}

impl RuleParam {
    pub fn pattern(&self) -> Option<&Regex> {
        match self {
            RuleParam::Pattern(regex) => Some(regex),
            _ => None,
        }
    }

    pub fn percent(&self) -> Option<u8> {
        match self {
            RuleParam::Percent(p) => Some(*p),
            _ => None,
        }
    }
}

/// A single compiled rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct HttpRule {
    verb: Verb,
    scope: Option<Regex>,
    param1: RuleParam,
    param2: Option<String>,
    /// `param2` rewritten into the regex crate's `${n}` replacement syntax.
    replacement: Option<String>,
}

impl HttpRule {
    pub(crate) fn new(verb: Verb, scope: Option<Regex>, param1: RuleParam) -> Self {
        Self { verb, scope, param1, param2: None, replacement: None }
    }

    pub(crate) fn replace(scope: Regex, find: Regex, with: String, replacement: String) -> Self {
        Self {
            verb: Verb::Replace,
            scope: Some(scope),
            param1: RuleParam::Pattern(find),
            param2: Some(with),
            replacement: Some(replacement),
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Anchored pattern applied to message field names.
    pub fn scope(&self) -> Option<&Regex> {
        self.scope.as_ref()
    }

    pub fn param1(&self) -> &RuleParam {
        &self.param1
    }

    /// Replacement text exactly as written in the rule.
    pub fn param2(&self) -> Option<&str> {
        self.param2.as_deref()
    }

    pub(crate) fn replacement(&self) -> &str {
        self.replacement.as_deref().unwrap_or_default()
    }

    /// True when the scope matches `name`. Rules without a scope never match.
    pub(crate) fn in_scope(&self, name: &str) -> bool {
        self.scope.as_ref().is_some_and(|s| s.is_match(name))
    }

    /// True when the first parameter is a pattern that matches `value`.
    pub(crate) fn value_matches(&self, value: &str) -> bool {
        self.param1.pattern().is_some_and(|p| p.is_match(value))
    }
}
