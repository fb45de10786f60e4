//! Application status machine
//!
//! The transition table below is the only place status legality is decided.
//! Authorization happens before this is consulted.

use hire_common::db::ApplicationStatus;

use crate::error::ApplicationError;

use ApplicationStatus::*;

const TRANSITIONS: &[(ApplicationStatus, &[ApplicationStatus])] = &[
    (Pending, &[Reviewing, Shortlisted, Rejected]),
    (Reviewing, &[Shortlisted, Rejected]),
    (Shortlisted, &[Interviewed, Accepted, Rejected]),
    (Interviewed, &[Accepted, Rejected]),
    (Accepted, &[]),
    (Rejected, &[]),
];

/// Statuses reachable from `from` in one step
pub fn allowed_targets(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    TRANSITIONS
        .iter()
        .find(|(state, _)| *state == from)
        .map(|(_, targets)| *targets)
        .unwrap_or(&[])
}

/// Check a requested transition
///
/// Terminal states reject every request with `AlreadyFinal`, including a
/// request for the state they are already in.
pub fn validate_transition(
    from: ApplicationStatus,
    to: ApplicationStatus,
) -> Result<(), ApplicationError> {
    if from.is_terminal() {
        return Err(ApplicationError::AlreadyFinal(from));
    }

    if allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(ApplicationError::InvalidTransition { from, to })
    }
}
