//! Protocol state tracking.
//!
//! RFC 3501 section 3 defines four connection states; every operation
//! checks its precondition against this before touching the wire, and
//! transitions happen only on the corresponding tagged OK (or on
//! transport loss).

/// Where the connection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    /// Greeted but no credentials accepted yet.
    #[default]
    NotAuthenticated,
    /// Credentials accepted; mailbox operations are available.
    Authenticated,
    /// A mailbox is open; message operations are available.
    Selected,
    /// The connection is gone (LOGOUT, BYE, or transport loss).
    Logout,
}

impl ProtocolState {
    /// True once credentials were accepted (selected counts).
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected)
    }

    /// True while a mailbox is open.
    #[must_use]
    pub const fn is_selected(self) -> bool {
        matches!(self, Self::Selected)
    }

    /// True once the connection is unusable.
    #[must_use]
    pub const fn is_logout(self) -> bool {
        matches!(self, Self::Logout)
    }
}
