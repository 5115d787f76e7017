// usagelogger-core/tests/rules_integration_tests.rs
use anyhow::Result;
use std::io::Write;
use tempfile::NamedTempFile;

use usagelogger_core::rules::compiler::parse_rule;
use usagelogger_core::{DefaultRules, ErrorKind, LoggerError, Message, RuleSet, Verb};

fn msg(pairs: &[(&str, &str)]) -> Message {
    pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect::<Vec<_>>().into()
}

#[test]
fn test_load_rules_from_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "# sample rules")?;
    writeln!(file, "allow_http_url")?;
    writeln!(file, "copy_session_field /.*/")?;
    writeln!(file, "sample 56")?;

    let rules = RuleSet::new(Some(&format!("file://{}", file.path().display())), &DefaultRules::new())?;
    assert_eq!(rules.len(), 3);
    assert!(rules.allow_http_url());
    assert_eq!(rules.rules_for(Verb::CopySessionField).len(), 1);
    assert_eq!(rules.sample(), Some(56));
    Ok(())
}

#[test]
fn test_missing_rules_file_is_a_load_error() {
    let err = RuleSet::new(Some("file://~/bleepblorpbleepblorp12345"), &DefaultRules::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Load);
    assert_eq!(err.to_string(), "Failed to load rules: ~/bleepblorpbleepblorp12345");
}

#[test]
fn test_rule_errors_name_their_input() {
    let err = RuleSet::from_text("sample 123").unwrap_err();
    assert!(err.to_string().contains("123"));

    let err = RuleSet::from_text("allow_http_url\n!!! stop").unwrap_err();
    assert!(matches!(err, LoggerError::UnescapedSeparator { separator: '!', .. }));

    let err = RuleSet::from_text("sample 10\nsample 20").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Semantic);
}

#[test]
fn test_include_default_with_shared_holder() -> Result<()> {
    let holder = DefaultRules::new();
    holder.set("include debug");
    let rules = RuleSet::new(Some("include default\nsample 50"), &holder)?;
    assert_eq!(rules.len(), 3);
    assert!(rules.allow_http_url());

    holder.set("");
    assert!(RuleSet::new(None, &holder)?.is_empty());
    holder.reset();
    assert_eq!(RuleSet::new(None, &holder)?.len(), 2);
    Ok(())
}

#[test]
fn test_replace_email_address() {
    let rules = RuleSet::from_text("/request_body/ replace /[a-zA-Z0-9.]+@[a-zA-Z0-9.]+/, /x@y.com/").unwrap();
    let out = rules.apply(msg(&[("request_body", "a@b.com")])).unwrap();
    assert_eq!(out.to_json(), r#"[["request_body","x@y.com"]]"#);
}

#[test]
fn test_stop_on_missing_and_present_key() {
    let rules = RuleSet::from_text("!response_header:blah! stop").unwrap();
    let out = rules
        .apply(msg(&[("request_method", "GET"), ("request_body", ""), ("response_code", "200")]))
        .unwrap();
    assert_eq!(out, msg(&[("request_method", "GET"), ("response_code", "200")]));
    assert!(rules.apply(msg(&[("response_header:blah", "1")])).is_none());
}

#[test]
fn test_sampling_rate() {
    let rules = RuleSet::from_text("sample 30").unwrap();
    let kept = (0..10_000)
        .filter(|_| rules.apply(msg(&[("request_body", "x")])).is_some())
        .count();
    assert!((2_500..3_500).contains(&kept), "kept {kept} of 10000");
}

#[test]
fn test_removal_runs_before_replace() {
    let rules = RuleSet::from_text(
        "/request_body/ replace /secret/, /public/\n/request_body/ remove_if_found /secret/",
    )
    .unwrap();
    let out = rules.apply(msg(&[("request_body", "secret"), ("response_body", "ok")])).unwrap();
    assert_eq!(out, msg(&[("response_body", "ok")]));
}

#[test]
fn test_parse_rule_is_public() {
    let rule = parse_rule("  /request_body/ stop_unless_found /KEEP/ # only keep marked bodies").unwrap().unwrap();
    assert_eq!(rule.verb(), Verb::StopUnlessFound);
    assert_eq!(rule.scope().unwrap().as_str(), "^request_body$");
    assert_eq!(rule.param1().pattern().unwrap().as_str(), "KEEP");
}
