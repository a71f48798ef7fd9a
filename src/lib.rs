pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use {
    crate::{domain::notify::Notifier, services::coordinator::RenewalCoordinator},
    std::{sync::Arc, time::Duration},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub webhook_secret: Arc<str>,
    pub api_key: Arc<str>,
    pub coordinator: Arc<RenewalCoordinator>,
    pub notifier: Arc<dyn Notifier>,
    pub batch_deadline: Duration,
}
