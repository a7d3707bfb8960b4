use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    services::{media::ImageHost, notifications::Notifier},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub media: Arc<dyn ImageHost>,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(
        orm: DatabaseConnection,
        config: AppConfig,
        media: Arc<dyn ImageHost>,
        notifier: Notifier,
    ) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            media,
            notifier,
        }
    }
}
