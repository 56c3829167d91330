/// Community events board
///
/// A REST backend for submitting community events, signing up as a
/// volunteer, and moderating submissions through an admin review queue.
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod events;
pub mod mailer;
pub mod metrics;
pub mod moderation;
pub mod notify;
pub mod places;
pub mod server;
pub mod users;
pub mod volunteers;
