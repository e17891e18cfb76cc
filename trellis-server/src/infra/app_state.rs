use std::{fmt, sync::Arc};

use trellis_core::TaskService;
use trellis_core::database::ports::UserStore;

use crate::infra::config::Config;
use crate::infra::websocket::ConnectionManager;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
    pub users: Arc<dyn UserStore>,
    pub channels: Arc<ConnectionManager>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
