//! # Hire Common Library
//!
//! Shared code for the recruitment services including:
//! - Data model (accounts, applicants, jobs, applications)
//! - Database initialization and schema
//! - Application events and the notification hub
//! - Configuration loading
//! - Server-Sent Events helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use events::{ApplicationEvent, ChannelKey, NotificationHub};
