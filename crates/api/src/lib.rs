//! HTTP front end of the Simple Slack notifier.
//!
//! Endpoints:
//! - POST /api/notification: post a message now, or once a CircleCI workflow finishes
//! - GET  /api/health: liveness probe

pub mod routes;
pub mod state;
