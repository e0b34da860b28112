use std::sync::Arc;

use crate::config::AppConfig;
use crate::service::SubmissionService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub submissions: Arc<SubmissionService>,
}
