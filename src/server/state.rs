use crate::locales::LocaleCatalog;
use crate::settings::Settings;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) settings: Settings,
    pub(crate) catalog: LocaleCatalog,
}
