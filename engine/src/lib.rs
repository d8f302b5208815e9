//! Org unit policy console: catalog listing, per-OU resolution, merge and
//! batch submission against the policy service.

pub mod api;
pub mod catalog;
pub mod categories;
pub mod directory;
pub mod edits;
pub mod error;
pub mod merge;
pub mod model;
pub mod resolver;
pub mod session;
pub mod submit;

pub use api::{HttpPolicyBackend, Page, PolicyBackend};
pub use directory::OrgDirectory;
pub use edits::{EditTracker, Submission};
pub use error::{EditError, PolicyError, SessionError};
pub use merge::{merge, MergeReport};
pub use model::{OrgUnit, PolicySchema, ResolvedPolicyValue};
pub use session::{ConsoleSession, LoadState, ResolveTicket};
pub use submit::{submit, submit_pending, BatchOutcome, SubmissionReport};
