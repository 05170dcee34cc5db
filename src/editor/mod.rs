//! Editor state machine.
//!
//! An [`Editor`] holds at most one [`EditSession`]. Generate actions move the
//! session through [`EditStatus`]:
//!
//! ```text
//! Idle/Success/Error --generate--> Processing --ok--> Success
//!                                             \--err--> Error
//! Error --dismiss--> Idle        any edited, not Processing --reset--> Idle
//! ```

mod session;
mod state;

pub use session::{EditSession, Editor, PendingEdit, SUGGESTED_PROMPTS};
pub use state::{EditOutcome, EditStatus, UploadOutcome};
