//! Session event notifications
//!
//! A caller-facing observer so a UI or CLI can react to authentication
//! changes without inspecting every return value.

/// Observer for authentication state changes.
pub trait SessionEvents: Send + Sync {
    /// A sign-in attempt finished, successfully or not.
    fn authentication_completed(&self, success: bool, email: &str);

    /// A call was rejected for lack of (or expired) authentication.
    /// The caller should prompt for login.
    fn authentication_required(&self);
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEvents;

impl SessionEvents for NullEvents {
    fn authentication_completed(&self, _success: bool, _email: &str) {}

    fn authentication_required(&self) {}
}
