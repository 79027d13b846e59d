use std::sync::Arc;
use sqlx::{Pool, Sqlite};
use crate::config::Config;
use crate::llm::LanguageModel;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub llm: Arc<dyn LanguageModel>,
    pub config: Arc<Config>,
}
