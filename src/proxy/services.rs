//! Table of reverse-proxied internal HTTP services.

use std::collections::HashMap;
use url::Url;

use crate::config::ProxyServiceConfig;
use crate::rpc::BackendTarget;

/// Proxied services by name, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct ProxyServices {
    services: HashMap<String, ProxyServiceConfig>,
}

impl ProxyServices {
    pub fn from_config(services: &[ProxyServiceConfig]) -> Self {
        Self {
            services: services
                .iter()
                .map(|s| (s.name.clone(), s.clone()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProxyServiceConfig> {
        self.services.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

/// Build the downstream URL for a proxied path.
pub fn target_url(
    service: &ProxyServiceConfig,
    target: &BackendTarget,
    path: &str,
    query: Option<&str>,
) -> Result<Url, url::ParseError> {
    let scheme = if service.tls { "https" } else { "http" };
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let mut url = Url::parse(&format!("{}://{}{}", scheme, target.authority(), path))?;
    url.set_query(query.filter(|q| !q.is_empty()));
    Ok(url)
}
