//! usage_loggers.rs - Process-wide switch consulted by every logger.
//!
//! The host calls [`set_hard_disabled`] once with its own configuration (for
//! example `USAGE_LOGGERS_DISABLE=true`). A hard disable cannot be undone with
//! [`enable`].
//!
//! License: MIT OR APACHE 2.0

use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

static HARD_DISABLED: AtomicBool = AtomicBool::new(false);
static DISABLED: AtomicBool = AtomicBool::new(false);

/// Records whether the host configuration disables all loggers.
pub fn set_hard_disabled(hard: bool) {
    HARD_DISABLED.store(hard, Ordering::SeqCst);
    if hard {
        info!("Usage loggers disabled by configuration.");
        DISABLED.store(true, Ordering::SeqCst);
    }
}

pub fn is_hard_disabled() -> bool {
    HARD_DISABLED.load(Ordering::SeqCst)
}

/// Disables all loggers.
pub fn disable() {
    DISABLED.store(true, Ordering::SeqCst);
}

/// Enables all loggers, unless hard disabled.
pub fn enable() {
    if !is_hard_disabled() {
        DISABLED.store(false, Ordering::SeqCst);
    }
}

pub fn is_enabled() -> bool {
    !DISABLED.load(Ordering::SeqCst)
}
