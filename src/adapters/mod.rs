pub mod api_errors;
pub mod auth;
pub mod notifier;
pub mod webhook;
