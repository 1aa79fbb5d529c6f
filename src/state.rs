use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::identity::IdentityProvider;
use crate::remote::RemoteConnector;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub connector: Arc<dyn RemoteConnector>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        connector: Arc<dyn RemoteConnector>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            connector,
            identity,
        }
    }
}
