//! Clinic portal gateway: self-check-in risk scoring and the per-session
//! live notification feed, served to the browser over HTTP.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod risk;
pub mod routes;
pub mod session;
