//! Build-completion monitoring and notification coordination.
//!
//! [`coordinator::NotificationCoordinator`] decides per request whether to post
//! right away or to start a [`monitor::BuildMonitor`] that polls CircleCI until
//! the workflow finishes. Monitors run as background tasks tracked by a
//! [`registry::MonitorRegistry`].

pub mod circleci;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod registry;

#[cfg(test)]
mod test_support;
