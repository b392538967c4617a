//! Error classification shared by every crate in the workspace.

/// The four failure classes the request layer distinguishes.
///
/// Every domain error type exposes a `kind()` that maps into this taxonomy;
/// the HTTP layer turns the kind into a status code and decides whether the
/// message is safe to show to the end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-correctable input problem (empty cart, bad quantity,
    /// illegal state transition, item no longer available).
    Validation,
    /// A referenced user, cart item, or catalog item does not exist.
    NotFound,
    /// An idempotency guard fired (e.g. payment reference already attached).
    Conflict,
    /// The relational or ephemeral store failed for reasons unrelated to
    /// business rules.
    Infrastructure,
}

impl ErrorKind {
    /// Returns true if the error message is safe to surface to end users.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ErrorKind::Infrastructure)
    }
}
