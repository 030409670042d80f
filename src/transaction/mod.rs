// ============================================================================
// Transaction Module
// ============================================================================
//
// Buffered units of work for the in-memory reference database.
//
// ============================================================================

pub mod change;
pub mod state;

pub use change::Change;
pub use state::{TransactionId, TransactionState};
