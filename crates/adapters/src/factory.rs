//! Adapter factory wiring credentials to concrete platform adapters

use std::sync::Arc;

use crosspost_domain::model::{Platform, PlatformCredentials};
use crosspost_domain::ports::{AdapterError, AdapterFactory, PlatformAdapter};

use crate::facebook::FacebookAdapter;
use crate::instagram::InstagramAdapter;
use crate::linkedin::LinkedInAdapter;
use crate::tiktok::TikTokAdapter;

/// Factory producing reqwest-backed adapters.
///
/// Base URLs are injectable so tests can point every platform at a
/// local mock server.
#[derive(Debug, Clone)]
pub struct HttpAdapterFactory {
    graph_base_url: String,
    linkedin_base_url: String,
    tiktok_base_url: String,
}

impl Default for HttpAdapterFactory {
    fn default() -> Self {
        Self {
            graph_base_url: "https://graph.facebook.com/v19.0".to_string(),
            linkedin_base_url: "https://api.linkedin.com".to_string(),
            tiktok_base_url: "https://open.tiktokapis.com".to_string(),
        }
    }
}

impl HttpAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.graph_base_url = base_url.into();
        self
    }

    pub fn with_linkedin_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.linkedin_base_url = base_url.into();
        self
    }

    pub fn with_tiktok_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.tiktok_base_url = base_url.into();
        self
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn create(
        &self,
        platform: Platform,
        credentials: &PlatformCredentials,
    ) -> Result<Arc<dyn PlatformAdapter>, AdapterError> {
        let adapter: Arc<dyn PlatformAdapter> = match platform {
            Platform::Instagram => Arc::new(InstagramAdapter::with_base_url(
                credentials,
                self.graph_base_url.clone(),
            )),
            Platform::Facebook => Arc::new(FacebookAdapter::with_base_url(
                credentials,
                self.graph_base_url.clone(),
            )),
            Platform::LinkedIn => Arc::new(LinkedInAdapter::with_base_url(
                credentials,
                self.linkedin_base_url.clone(),
            )),
            Platform::TikTok => Arc::new(TikTokAdapter::with_base_url(
                credentials,
                self.tiktok_base_url.clone(),
            )),
        };
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_an_adapter_for_every_platform() {
        let factory = HttpAdapterFactory::new();
        let creds = PlatformCredentials::new("token");

        for platform in Platform::ALL {
            let adapter = factory.create(platform, &creds).unwrap();
            assert_eq!(adapter.platform(), platform);
        }
    }
}
