//! ruleset.rs - The compiled policy and the filtering pipeline applied to each message.
//!
//! Stages run in a fixed order: stop, stop_if, stop_unless, sample, the remove
//! family, replace, then removal of empty values. Any stage may drop the
//! message.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashMap;

use log::debug;
use serde_json::Value;

use crate::errors::LoggerError;
use crate::message::Message;
use crate::rules::compiler::compile_rules;
use crate::rules::defaults::{expand_includes, resolve, DefaultRules};
use crate::rules::{HttpRule, Verb};

/// An immutable, compiled set of rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    text: String,
    rules: Vec<HttpRule>,
    by_verb: HashMap<Verb, Vec<HttpRule>>,
    allow_http_url: bool,
    skip_compression: bool,
    skip_submission: bool,
    sample: Option<u8>,
}

impl RuleSet {
    /// Resolves `rules` against `defaults` and compiles the result.
    pub fn new(rules: Option<&str>, defaults: &DefaultRules) -> Result<Self, LoggerError> {
        let text = resolve(rules, defaults)?;
        Self::from_text(text)
    }

    /// Compiles already resolved rule text. Blank text yields an empty set.
    pub fn from_text(text: impl Into<String>) -> Result<Self, LoggerError> {
        let text = text.into();
        let rules = compile_rules(&expand_includes(&text))?;

        let mut by_verb: HashMap<Verb, Vec<HttpRule>> = HashMap::new();
        for rule in &rules {
            by_verb.entry(rule.verb()).or_default().push(rule.clone());
        }

        let samples = by_verb.get(&Verb::Sample).map_or(0, Vec::len);
        if samples > 1 {
            return Err(LoggerError::MultipleSampleRules(samples));
        }
        let sample = by_verb
            .get(&Verb::Sample)
            .and_then(|r| r.first())
            .and_then(|r| r.param1().percent());

        Ok(Self {
            allow_http_url: by_verb.contains_key(&Verb::AllowHttpUrl),
            skip_compression: by_verb.contains_key(&Verb::SkipCompression),
            skip_submission: by_verb.contains_key(&Verb::SkipSubmission),
            text,
            rules,
            by_verb,
            sample,
        })
    }

    /// The rule text this set was compiled from, after `include default` expansion.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules in declaration order.
    pub fn rules(&self) -> &[HttpRule] {
        &self.rules
    }

    /// Rules with the given verb, in declaration order.
    pub fn rules_for(&self, verb: Verb) -> &[HttpRule] {
        self.by_verb.get(&verb).map_or(&[], Vec::as_slice)
    }

    pub fn allow_http_url(&self) -> bool {
        self.allow_http_url
    }

    pub fn skip_compression(&self) -> bool {
        self.skip_compression
    }

    pub fn skip_submission(&self) -> bool {
        self.skip_submission
    }

    /// Percentage of messages kept by the `sample` rule, if any.
    pub fn sample(&self) -> Option<u8> {
        self.sample
    }

    /// Appends a `session_field:<key>` pair for every session entry named by a
    /// `copy_session_field` rule.
    pub fn copy_session_fields(&self, message: &mut Message, session: &[(String, Value)]) {
        for rule in self.rules_for(Verb::CopySessionField) {
            for (key, value) in session {
                if rule.value_matches(key) {
                    let rendered = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    message.push(format!("session_field:{key}"), rendered);
                }
            }
        }
    }

    /// Runs the filtering pipeline. Returns `None` when the message is dropped.
    pub fn apply(&self, mut message: Message) -> Option<Message> {
        // stop
        for rule in self.rules_for(Verb::Stop) {
            if message.iter().any(|(name, _)| rule.in_scope(name)) {
                debug!("Message dropped by stop rule {:?}", rule.scope().map(|s| s.as_str()));
                return None;
            }
        }

        // stop_if, stop_if_found
        for verb in [Verb::StopIf, Verb::StopIfFound] {
            for rule in self.rules_for(verb) {
                if message.iter().any(|(name, value)| rule.in_scope(name) && rule.value_matches(value)) {
                    debug!("Message dropped by {verb} rule");
                    return None;
                }
            }
        }

        // stop_unless, stop_unless_found
        for verb in [Verb::StopUnless, Verb::StopUnlessFound] {
            let satisfied = self.rules_for(verb).iter().all(|rule| {
                message.iter().any(|(name, value)| rule.in_scope(name) && rule.value_matches(value))
            });
            if !satisfied {
                debug!("Message dropped by {verb} rule");
                return None;
            }
        }

        if let Some(percent) = self.sample {
            if rand::random::<f64>() * 100.0 >= f64::from(percent) {
                debug!("Message dropped by sampling at {percent}%");
                return None;
            }
        }

        for rule in self.rules_for(Verb::Remove) {
            message.retain(|name, _| !rule.in_scope(name));
        }
        for rule in self.rules_for(Verb::RemoveUnlessFound) {
            message.retain(|name, value| !rule.in_scope(name) || rule.value_matches(value));
        }
        for rule in self.rules_for(Verb::RemoveIfFound) {
            message.retain(|name, value| !rule.in_scope(name) || !rule.value_matches(value));
        }
        for rule in self.rules_for(Verb::RemoveUnless) {
            message.retain(|name, value| !rule.in_scope(name) || rule.value_matches(value));
        }
        for rule in self.rules_for(Verb::RemoveIf) {
            message.retain(|name, value| !rule.in_scope(name) || !rule.value_matches(value));
        }
        if message.is_empty() {
            debug!("Message dropped after removing every field");
            return None;
        }

        for rule in self.rules_for(Verb::Replace) {
            let Some(find) = rule.param1().pattern() else {
                continue;
            };
            for (name, value) in message.iter_mut() {
                if rule.in_scope(name) {
                    let replaced = find.replace_all(value, rule.replacement()).into_owned();
                    *value = replaced;
                }
            }
        }

        message.retain(|_, value| !value.is_empty());
        if message.is_empty() {
            return None;
        }
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(pairs: &[(&str, &str)]) -> Message {
        pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect::<Vec<_>>().into()
    }

    fn rules(text: &str) -> RuleSet {
        RuleSet::from_text(text).unwrap()
    }

    #[test]
    fn test_include_counts() {
        assert_eq!(rules("include debug").len(), 2);
        assert!(rules("include debug").allow_http_url());
        assert_eq!(rules("include debug\ninclude debug\n").len(), 4);
        assert_eq!(rules("include standard").len(), 3);
        assert_eq!(rules("include standard").rules_for(Verb::Replace).len(), 2);
        assert_eq!(rules("include standard\nsample 50\ninclude standard\n").len(), 7);
        let strict = rules("include strict\nsample 50");
        assert_eq!(strict.len(), 3);
        assert_eq!(strict.rules_for(Verb::Remove).len(), 1);
        assert_eq!(strict.rules_for(Verb::Replace).len(), 1);
        assert_eq!(strict.sample(), Some(50));
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert!(rules("").is_empty());
        assert!(rules("# just a comment\n\n").is_empty());
    }

    #[test]
    fn test_new_falls_back_to_defaults() {
        let defaults = DefaultRules::new();
        let set = RuleSet::new(None, &defaults).unwrap();
        assert_eq!(set.len(), 2);
        defaults.set("include debug");
        assert_eq!(RuleSet::new(Some("  "), &defaults).unwrap().len(), 2);
        assert!(RuleSet::new(Some("  "), &defaults).unwrap().allow_http_url());
    }

    #[test]
    fn test_multiple_sample_rules_rejected() {
        let err = RuleSet::from_text("sample 10\nsample 20").unwrap_err();
        assert!(matches!(err, LoggerError::MultipleSampleRules(2)));
        assert_eq!(err.to_string(), "Multiple sample rules");
    }

    #[test]
    fn test_stop() {
        let set = rules("!response_header:blah! stop");
        let kept = set.apply(msg(&[("request_body", "hi"), ("response_body", "")])).unwrap();
        assert_eq!(kept, msg(&[("request_body", "hi")]));
        assert!(set.apply(msg(&[("request_body", "hi"), ("response_header:blah", "x")])).is_none());
    }

    #[test]
    fn test_stop_if_and_found() {
        let set = rules("/response_body/ stop_if /<!--IGNORE-->/");
        assert!(set.apply(msg(&[("response_body", "<!--IGNORE-->")])).is_none());
        assert!(set.apply(msg(&[("response_body", "x<!--IGNORE-->")])).is_some());

        let set = rules("/response_body/ stop_if_found /IGNORE/");
        assert!(set.apply(msg(&[("response_body", "x<!--IGNORE-->")])).is_none());
        assert!(set.apply(msg(&[("request_body", "IGNORE")])).is_some());
    }

    #[test]
    fn test_stop_unless_requires_every_rule() {
        let set = rules("/response_body/ stop_unless_found /KEEP/\n/request_body/ stop_unless /yes/");
        assert!(set.apply(msg(&[("response_body", "KEEP me"), ("request_body", "yes")])).is_some());
        assert!(set.apply(msg(&[("response_body", "KEEP me"), ("request_body", "no")])).is_none());
        assert!(set.apply(msg(&[("request_body", "yes")])).is_none());
    }

    #[test]
    fn test_remove_family() {
        let set = rules("/request_header:.*/ remove");
        let out = set.apply(msg(&[("request_header:a", "1"), ("response_body", "b")])).unwrap();
        assert_eq!(out, msg(&[("response_body", "b")]));
        assert!(set.apply(msg(&[("request_header:a", "1")])).is_none());

        let set = rules("/response_body/ remove_if_found /SECRET/");
        let out = set.apply(msg(&[("response_body", "a SECRET"), ("request_body", "SECRET")])).unwrap();
        assert_eq!(out, msg(&[("request_body", "SECRET")]));

        let set = rules("/response_body/ remove_unless_found /PUBLIC/");
        let out = set.apply(msg(&[("response_body", "private"), ("request_body", "x")])).unwrap();
        assert_eq!(out, msg(&[("request_body", "x")]));

        let set = rules("/.*_body/ remove_unless /ok/");
        let out = set.apply(msg(&[("response_body", "ok"), ("request_body", "not ok")])).unwrap();
        assert_eq!(out, msg(&[("response_body", "ok")]));

        let set = rules("/.*_body/ remove_if /ok/");
        let out = set.apply(msg(&[("response_body", "ok"), ("request_body", "not ok")])).unwrap();
        assert_eq!(out, msg(&[("request_body", "not ok")]));
    }

    #[test]
    fn test_replace() {
        let set = rules("/request_body/ replace /[a-zA-Z0-9.]+@[a-zA-Z0-9.]+/, /x@y.com/");
        let out = set.apply(msg(&[("request_body", "a@b.com")])).unwrap();
        assert_eq!(out, msg(&[("request_body", "x@y.com")]));

        let set = rules("/request_body/ replace /(\\w+)@(\\w+)/, /$2 at $1abc/");
        let out = set.apply(msg(&[("request_body", "kurt@resurface")])).unwrap();
        assert_eq!(out, msg(&[("request_body", "resurface at kurtabc")]));

        let set = rules("/request_body/ replace /secret/, //");
        assert!(set.apply(msg(&[("request_body", "secret")])).is_none());
    }

    #[test]
    fn test_strict_rules() {
        let set = rules("include strict");
        let out = set
            .apply(msg(&[
                ("request_url", "http://localhost/index.html?boo=yah"),
                ("request_header:user-agent", "Mozilla"),
                ("request_header:cookie", "c"),
                ("request_header:u", "x"),
                ("request_param:foo", "bar"),
                ("response_header:content-type", "text/html"),
                ("response_header:content-length", "10"),
                ("response_header:set-cookie", "s"),
                ("response_body", "<html>"),
            ]))
            .unwrap();
        assert_eq!(
            out,
            msg(&[
                ("request_url", "http://localhost/index.html"),
                ("request_header:user-agent", "Mozilla"),
                ("response_header:content-type", "text/html"),
                ("response_header:content-length", "10"),
            ])
        );
    }

    #[test]
    fn test_standard_rules() {
        let set = rules("include standard");
        let out = set
            .apply(msg(&[
                ("request_header:cookie", "c"),
                ("request_body", "mail kurt@resurface.io now"),
                ("response_body", "call 555-123-4567"),
            ]))
            .unwrap();
        assert_eq!(
            out,
            msg(&[("request_body", "mail x@y.com now"), ("response_body", "call xyxy")])
        );
    }

    #[test]
    fn test_copy_session_fields() {
        let set = rules("copy_session_field /butter|sweet/");
        let mut message = Message::default();
        let session = vec![
            ("butter".to_string(), Value::from("salted")),
            ("sweet".to_string(), serde_json::json!({"a": 1})),
            ("other".to_string(), Value::from("no")),
        ];
        set.copy_session_fields(&mut message, &session);
        assert_eq!(
            message,
            msg(&[("session_field:butter", "salted"), ("session_field:sweet", "{\"a\":1}")])
        );
    }
}
