//! Application events and notification fan-out
//!
//! Events are published to a process-wide [`NotificationHub`] and delivered to
//! live dashboards over named channels (see [`ChannelKey`]).

mod channel;
mod hub;

pub use channel::ChannelKey;
pub use hub::{NotificationHub, Subscription, SubscriptionStream};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::ApplicationStatus;

/// Application lifecycle events
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApplicationEvent {
    /// A new application was persisted
    ///
    /// Triggers:
    /// - Recruiter dashboard: add row to the job's applicant list
    /// - Global activity feed: increment live counters
    ApplicationCreated {
        application_id: Uuid,
        job_id: Uuid,
        job_title: String,
        applicant_id: Uuid,
        /// Account of the applicant, routes to the applicant's own view
        applicant_account_id: Option<Uuid>,
        applicant_name: String,
        /// Owning recruiter, routes to the recruiter channel
        recruiter_id: Option<Uuid>,
        status: ApplicationStatus,
        timestamp: DateTime<Utc>,
    },

    /// A recruiter or admin moved an application to a new status
    ApplicationStatusChanged {
        application_id: Uuid,
        job_id: Uuid,
        applicant_id: Uuid,
        applicant_account_id: Option<Uuid>,
        recruiter_id: Option<Uuid>,
        old_status: ApplicationStatus,
        new_status: ApplicationStatus,
        timestamp: DateTime<Utc>,
    },

    /// An application was withdrawn or deleted by an admin
    ApplicationWithdrawn {
        application_id: Uuid,
        job_id: Uuid,
        applicant_id: Uuid,
        applicant_account_id: Option<Uuid>,
        recruiter_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },
}

impl ApplicationEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ApplicationEvent::ApplicationCreated { .. } => "ApplicationCreated",
            ApplicationEvent::ApplicationStatusChanged { .. } => "ApplicationStatusChanged",
            ApplicationEvent::ApplicationWithdrawn { .. } => "ApplicationWithdrawn",
        }
    }

    pub fn application_id(&self) -> Uuid {
        match self {
            ApplicationEvent::ApplicationCreated { application_id, .. }
            | ApplicationEvent::ApplicationStatusChanged { application_id, .. }
            | ApplicationEvent::ApplicationWithdrawn { application_id, .. } => *application_id,
        }
    }

    pub fn recruiter_id(&self) -> Option<Uuid> {
        match self {
            ApplicationEvent::ApplicationCreated { recruiter_id, .. }
            | ApplicationEvent::ApplicationStatusChanged { recruiter_id, .. }
            | ApplicationEvent::ApplicationWithdrawn { recruiter_id, .. } => *recruiter_id,
        }
    }

    pub fn applicant_account_id(&self) -> Option<Uuid> {
        match self {
            ApplicationEvent::ApplicationCreated { applicant_account_id, .. }
            | ApplicationEvent::ApplicationStatusChanged { applicant_account_id, .. }
            | ApplicationEvent::ApplicationWithdrawn { applicant_account_id, .. } => {
                *applicant_account_id
            }
        }
    }

    /// Channels this event is delivered to
    ///
    /// Always `global`; plus the owning recruiter's channel and the applicant's
    /// own channel when those ids are known.
    pub fn routes(&self) -> Vec<ChannelKey> {
        let mut routes = vec![ChannelKey::Global];
        if let Some(recruiter_id) = self.recruiter_id() {
            routes.push(ChannelKey::Recruiter(recruiter_id));
        }
        if let Some(account_id) = self.applicant_account_id() {
            routes.push(ChannelKey::Applicant(account_id));
        }
        routes
    }
}
