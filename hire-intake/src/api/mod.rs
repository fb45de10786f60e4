//! HTTP API handlers for hire-intake

pub mod applications;
pub mod caller;
pub mod events;
pub mod health;

pub use applications::{
    get_application, list_job_applications, list_recruiter_applications, submit_application,
    update_application_status, withdraw_application,
};
pub use caller::Caller;
pub use events::subscribe;
pub use health::health_routes;
