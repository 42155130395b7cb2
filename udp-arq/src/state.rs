//! Transfer phase types.
//!
//! Both engines walk the same four phases, in order, exactly once per
//! process:
//!
//! ```text
//!  IDLE ──greeting──▶ GREETING ──"OK"──▶ METADATA ──name + size──▶ TRANSFER
//!                                                                     │
//!                                                                EOT  │
//!                                                                     ▼
//!                                                                  CLOSED
//! ```
//!
//! Transitions live in [`crate::file_sender`] and [`crate::file_receiver`];
//! this module only names the states so both sides log them the same way.

/// Where an engine currently is in its single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing sent or received yet.
    #[default]
    Idle,
    /// Greeting exchange in progress.
    Greeting,
    /// Filename and file-size exchange in progress.
    Metadata,
    /// Numbered data frames flowing.
    Transfer,
    /// EOT sent (sender) or observed (receiver).
    Closed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Greeting => "HANDSHAKE_GREET",
            Self::Metadata => "HANDSHAKE_META",
            Self::Transfer => "TRANSFER",
            Self::Closed => "TERMINATE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
    }

    #[test]
    fn display_uses_phase_names() {
        assert_eq!(Phase::Greeting.to_string(), "HANDSHAKE_GREET");
        assert_eq!(Phase::Closed.to_string(), "TERMINATE");
    }
}
