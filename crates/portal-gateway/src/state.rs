use portal_redirector::Redirector;
use portal_shortener::LinkService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub(crate) links: LinkService,
    pub(crate) redirector: Arc<dyn Redirector>,
    base_url: String,
}

impl AppState {
    pub fn new(
        links: LinkService,
        redirector: Arc<dyn Redirector>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            links,
            redirector,
            base_url: public_base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
