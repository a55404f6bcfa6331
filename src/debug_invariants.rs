//! Structural checks on mesh blocks.
//!
//! [`DebugInvariants::validate_invariants`] is always available and
//! returns the first violation (offsets out of order, connectivity out of
//! range, field tuple counts that disagree with the block). The asserting
//! form only fires in debug builds or with the `check-invariants` feature.

use crate::mesh_error::CgnsError;

pub trait DebugInvariants {
    /// Panic on a violation when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    fn validate_invariants(&self) -> Result<(), CgnsError>;
}

/// Panic with `$what` and the error when `$expr` fails and invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $what:literal) => {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $what, ": {}"), e);
        }
    };
}
