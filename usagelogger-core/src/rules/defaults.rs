//! defaults.rs - Canned rule bodies, `include` expansion and the default rules holder.
//!
//! License: MIT OR APACHE 2.0

use std::fs;
use std::sync::RwLock;

use lazy_static::lazy_static;
use log::debug;
use regex::{NoExpand, Regex};

use crate::errors::LoggerError;

/// Rules exposing every detail, for debugging an application.
pub const DEBUG_RULES: &str = "allow_http_url\ncopy_session_field /.*/\n";

/// Removes cookies and masks e-mail addresses and long numeric runs.
pub const STANDARD_RULES: &str = concat!(
    "/request_header:cookie|response_header:set-cookie/ remove\n",
    r"/(request|response)_body|request_param/ replace /[a-zA-Z0-9.!#$%&’*+\/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)/, /x@y.com/",
    "\n",
    r"/request_body|request_param|response_body/ replace /[0-9\.\-\/]{9,}/, /xyxy/",
    "\n",
);

/// Keeps only the request path, the user agent and response content headers.
///
/// Header exclusions are spelled out as complement patterns because the regex
/// engine has no look-ahead.
pub const STRICT_RULES: &str = concat!(
    r"/request_url/ replace /([^\?;]+).*/, /$1/",
    "\n",
    "/(request_body|response_body|request_param:.*",
    "|request_header:([^u].*|u([^s].*)?|us([^e].*)?|use([^r].*)?|user([^-].*)?|user-([^a].*)?",
    "|user-a([^g].*)?|user-ag([^e].*)?|user-age([^n].*)?|user-agen([^t].*)?)?",
    "|response_header:([^c].*|c([^o].*)?|co([^n].*)?|con([^t].*)?|cont([^e].*)?|conte([^n].*)?",
    "|conten([^t].*)?|content([^-].*)?|content-([^lt].*)?",
    "|content-l([^e].*)?|content-le([^n].*)?|content-len([^g].*)?|content-leng([^t].*)?|content-lengt([^h].*)?",
    "|content-t([^y].*)?|content-ty([^p].*)?|content-typ([^e].*)?)?)/ remove\n",
);

lazy_static! {
    static ref INCLUDE_DEFAULT: Regex = Regex::new(r"(?m)^\s*include default\s*$").unwrap();
    static ref INCLUDE_DEBUG: Regex = Regex::new(r"(?m)^\s*include debug\s*$").unwrap();
    static ref INCLUDE_STANDARD: Regex = Regex::new(r"(?m)^\s*include standard\s*$").unwrap();
    static ref INCLUDE_STRICT: Regex = Regex::new(r"(?m)^\s*include strict\s*$").unwrap();
}

/// Holder for the rule text used when a logger is given no rules.
///
/// Shared behind an `Arc` by every logger that should see updates.
#[derive(Debug)]
pub struct DefaultRules {
    text: RwLock<String>,
}

impl Default for DefaultRules {
    fn default() -> Self {
        Self { text: RwLock::new(STRICT_RULES.to_string()) }
    }
}

impl DefaultRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current default rule text.
    pub fn get(&self) -> String {
        match self.text.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replaces the default rule text. `include default` lines are dropped.
    pub fn set(&self, text: &str) {
        let stripped = INCLUDE_DEFAULT.replace_all(text, "").into_owned();
        debug!("Default rules set ({} bytes).", stripped.len());
        match self.text.write() {
            Ok(mut guard) => *guard = stripped,
            Err(poisoned) => *poisoned.into_inner() = stripped,
        }
    }

    /// Restores the strict rules.
    pub fn reset(&self) {
        self.set(STRICT_RULES);
    }
}

/// Resolves the rule text a logger was configured with.
///
/// `file://<path>` is read from disk, blank text falls back to `defaults`, and
/// `include default` lines are replaced by the default text. The result is the
/// text a `RuleSet` reports; the named macros are expanded later by
/// [`expand_includes`].
pub fn resolve(rules: Option<&str>, defaults: &DefaultRules) -> Result<String, LoggerError> {
    let text = match rules {
        Some(r) if r.starts_with("file://") => {
            let path = r["file://".len()..].trim();
            debug!("Loading rules from {path}");
            fs::read_to_string(path).map_err(|source| LoggerError::RulesLoad {
                path: path.to_string(),
                source,
            })?
        }
        Some(r) => r.to_string(),
        None => String::new(),
    };

    if text.trim().is_empty() {
        return Ok(defaults.get());
    }
    let default_text = defaults.get();
    Ok(INCLUDE_DEFAULT.replace_all(&text, NoExpand(&default_text)).into_owned())
}

/// Expands `include debug`, `include standard` and `include strict` lines.
pub fn expand_includes(text: &str) -> String {
    let text = INCLUDE_DEBUG.replace_all(text, NoExpand(DEBUG_RULES));
    let text = INCLUDE_STANDARD.replace_all(&text, NoExpand(STANDARD_RULES));
    INCLUDE_STRICT.replace_all(&text, NoExpand(STRICT_RULES)).into_owned()
}
