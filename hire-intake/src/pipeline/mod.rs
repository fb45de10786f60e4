//! Job-application ingestion pipeline
//!
//! Components, leaf first: [`identity`] resolves who is applying,
//! [`duplicate`] guards the (applicant, job) pair, [`store`] persists records
//! and counters, [`status`] owns transition legality, and [`orchestrator`]
//! sequences them and publishes notifications.

pub mod duplicate;
pub mod identity;
pub mod orchestrator;
pub mod retry;
pub mod status;
pub mod store;

pub use duplicate::{DuplicateCheck, DuplicateGuard};
pub use identity::{ApplicantHints, IdentityResolver, ResolvedIdentity};
pub use orchestrator::{
    IngestionOrchestrator, StatusUpdateRequest, SubmitApplication, SubmitOutcome, WithdrawRequest,
};
pub use retry::RetryPolicy;
pub use store::{ApplicationStore, NewApplication};
