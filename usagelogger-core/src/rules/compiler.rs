//! compiler.rs - Compiles rule text into `HttpRule`s.
//!
//! Every line is matched against a fixed table of line shapes. The first shape
//! that matches decides the verb and which captured literals are compiled as
//! anchored patterns, unanchored patterns, plain strings or a percentage.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use regex::{Captures, Regex, RegexBuilder};

use crate::errors::LoggerError;
use crate::rules::{HttpRule, RuleParam, Verb};

/// Delimiters accepted around literals, in the order they are tried.
pub const SEPARATORS: [char; 5] = ['~', '!', '%', '|', '/'];

/// Upper bound on the compiled size of a single rule pattern.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

lazy_static! {
    static ref BLANK_OR_COMMENT: Regex = Regex::new(r"^\s*(#.*)*$").unwrap();

    /// Line shapes in evaluation order.
    static ref LINE_SHAPES: Vec<(Verb, Regex)> = {
        const LIT: &str = r"([~!%|/].+[~!%|/])";
        const TAIL: &str = r"\s*(#.*)?$";
        let scoped = |verb: &str| format!(r"^\s*{LIT}\s*{verb}\s+{LIT}{TAIL}");
        let shapes = [
            (Verb::AllowHttpUrl, format!(r"^\s*allow_http_url{TAIL}")),
            (Verb::CopySessionField, format!(r"^\s*copy_session_field\s+{LIT}{TAIL}")),
            (Verb::Remove, format!(r"^\s*{LIT}\s*remove{TAIL}")),
            (Verb::RemoveIf, scoped("remove_if")),
            (Verb::RemoveIfFound, scoped("remove_if_found")),
            (Verb::RemoveUnless, scoped("remove_unless")),
            (Verb::RemoveUnlessFound, scoped("remove_unless_found")),
            (
                Verb::Replace,
                format!(r"^\s*{LIT}\s*replace\s+{LIT},\s+([~!%|/].*[~!%|/]){TAIL}"),
            ),
            (Verb::Sample, format!(r"^\s*sample\s+([0-9]+){TAIL}")),
            (Verb::SkipCompression, format!(r"^\s*skip_compression{TAIL}")),
            (Verb::SkipSubmission, format!(r"^\s*skip_submission{TAIL}")),
            (Verb::Stop, format!(r"^\s*{LIT}\s*stop{TAIL}")),
            (Verb::StopIf, scoped("stop_if")),
            (Verb::StopIfFound, scoped("stop_if_found")),
            (Verb::StopUnless, scoped("stop_unless")),
            (Verb::StopUnlessFound, scoped("stop_unless_found")),
        ];
        shapes
            .into_iter()
            .map(|(verb, pattern)| (verb, Regex::new(&pattern).unwrap()))
            .collect()
    };
}

/// Compiles every rule in `text`, skipping blank and comment lines.
///
/// `text` must already have its `include` macros expanded.
pub fn compile_rules(text: &str) -> Result<Vec<HttpRule>, LoggerError> {
    let mut rules = Vec::new();
    for line in text.split('\n') {
        if let Some(rule) = parse_rule(line)? {
            rules.push(rule);
        }
    }
    debug!("Compiled {} rules.", rules.len());
    Ok(rules)
}

/// Parses a single line. Blank and comment lines yield `Ok(None)`.
pub fn parse_rule(line: &str) -> Result<Option<HttpRule>, LoggerError> {
    if BLANK_OR_COMMENT.is_match(line) {
        return Ok(None);
    }

    let (verb, caps) = LINE_SHAPES
        .iter()
        .find_map(|(verb, shape)| shape.captures(line).map(|caps| (*verb, caps)))
        .ok_or_else(|| LoggerError::InvalidRule(line.to_string()))?;

    let rule = match verb {
        Verb::AllowHttpUrl | Verb::SkipCompression | Verb::SkipSubmission => {
            HttpRule::new(verb, None, RuleParam::None)
        }
        Verb::CopySessionField => {
            let pattern = parse_regex(line, group(&caps, 1))?;
            HttpRule::new(verb, None, RuleParam::Pattern(pattern))
        }
        Verb::Remove | Verb::Stop => {
            HttpRule::new(verb, Some(parse_regex(line, group(&caps, 1))?), RuleParam::None)
        }
        Verb::RemoveIf | Verb::RemoveUnless | Verb::StopIf | Verb::StopUnless => {
            let scope = parse_regex(line, group(&caps, 1))?;
            let pattern = parse_regex(line, group(&caps, 2))?;
            HttpRule::new(verb, Some(scope), RuleParam::Pattern(pattern))
        }
        Verb::RemoveIfFound | Verb::RemoveUnlessFound | Verb::StopIfFound | Verb::StopUnlessFound => {
            let scope = parse_regex(line, group(&caps, 1))?;
            let pattern = parse_regex_find(line, group(&caps, 2))?;
            HttpRule::new(verb, Some(scope), RuleParam::Pattern(pattern))
        }
        Verb::Replace => {
            let scope = parse_regex(line, group(&caps, 1))?;
            let find = parse_regex_find(line, group(&caps, 2))?;
            let with = parse_string(line, group(&caps, 3))?;
            let replacement = translate_replacement(&with, find.captures_len() - 1);
            HttpRule::replace(scope, find, with, replacement)
        }
        Verb::Sample => {
            let raw = group(&caps, 1);
            let percent = raw
                .parse::<u8>()
                .ok()
                .filter(|p| (1..=99).contains(p))
                .ok_or_else(|| LoggerError::InvalidSamplePercent(raw.to_string()))?;
            HttpRule::new(verb, None, RuleParam::Percent(percent))
        }
    };
    Ok(Some(rule))
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

/// Compiles a delimited literal as an anchored pattern for full matches.
pub fn parse_regex(rule: &str, expression: &str) -> Result<Regex, LoggerError> {
    let mut pattern = parse_string(rule, expression)?;
    if !pattern.starts_with('^') {
        pattern.insert(0, '^');
    }
    if !pattern.ends_with('$') {
        pattern.push('$');
    }
    build_regex(rule, expression, &pattern)
}

/// Compiles a delimited literal as an unanchored pattern for finding.
pub fn parse_regex_find(rule: &str, expression: &str) -> Result<Regex, LoggerError> {
    let pattern = parse_string(rule, expression)?;
    build_regex(rule, expression, &pattern)
}

fn build_regex(rule: &str, expression: &str, pattern: &str) -> Result<Regex, LoggerError> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|source| LoggerError::InvalidRegex {
            expression: expression.to_string(),
            rule: rule.to_string(),
            source,
        })
}

/// Strips the delimiters from a literal and unescapes `\<delim>`.
pub fn parse_string(rule: &str, expression: &str) -> Result<String, LoggerError> {
    for sep in SEPARATORS {
        if expression.len() < 2 || !expression.starts_with(sep) || !expression.ends_with(sep) {
            continue;
        }
        let inner = &expression[1..expression.len() - 1];
        if has_unescaped(inner, sep) {
            return Err(LoggerError::UnescapedSeparator { separator: sep, rule: rule.to_string() });
        }
        return Ok(inner.replace(&format!("\\{sep}"), &sep.to_string()));
    }
    Err(LoggerError::InvalidExpression {
        expression: expression.to_string(),
        rule: rule.to_string(),
    })
}

fn has_unescaped(inner: &str, sep: char) -> bool {
    let mut prev: Option<char> = None;
    for c in inner.chars() {
        if c == sep && prev != Some('\\') {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Rewrites `$n`, `$&` and `$$` into `${n}` / `$$` form.
///
/// A `$` that does not start a valid reference is kept literally, and a group
/// number beyond `groups` is left as literal text.
pub(crate) fn translate_replacement(with: &str, groups: usize) -> String {
    let chars: Vec<char> = with.chars().collect();
    let mut out = String::with_capacity(with.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        match chars.get(i + 1) {
            Some('$') => {
                out.push_str("$$");
                i += 2;
            }
            Some('&') => {
                out.push_str("${0}");
                i += 2;
            }
            Some(d) if d.is_ascii_digit() => {
                let first = d.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .get(i + 2)
                    .and_then(|c| c.to_digit(10))
                    .map(|second| first * 10 + second as usize)
                    .filter(|n| *n >= 1 && *n <= groups);
                if let Some(n) = two {
                    out.push_str(&format!("${{{n}}}"));
                    i += 3;
                } else if first >= 1 && first <= groups {
                    out.push_str(&format!("${{{first}}}"));
                    i += 2;
                } else {
                    out.push_str("$$");
                    i += 1;
                }
            }
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }
    out
}
