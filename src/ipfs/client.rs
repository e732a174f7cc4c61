use std::time::Duration;
use tracing::{debug, info};

use crate::types::{Erc8004Error, RegistrationFile, Result};

pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/ipfs";

/// Map a tokenURI to an HTTP URL.
///
/// `ipfs://CID[/path]` becomes `{gateway}/CID[/path]`; `http(s)://` passes
/// through; anything else is rejected.
pub fn resolve_uri(uri: &str, gateway: &str) -> Result<String> {
    let uri = uri.trim();

    if let Some(cid) = uri.strip_prefix("ipfs://") {
        let cid = cid.strip_prefix("ipfs/").unwrap_or(cid);
        if cid.is_empty() {
            return Err(Erc8004Error::InvalidArgument(format!(
                "IPFS URI without CID: {}",
                uri
            )));
        }
        return Ok(format!("{}/{}", gateway.trim_end_matches('/'), cid));
    }

    if uri.starts_with("https://") || uri.starts_with("http://") {
        return Ok(uri.to_string());
    }

    let scheme = uri.split(':').next().unwrap_or(uri);
    Err(Erc8004Error::UnsupportedUriScheme(format!(
        "{} (from {})",
        scheme, uri
    )))
}

/// Fetches agent registration files from IPFS gateways or plain HTTP
#[derive(Debug, Clone)]
pub struct RegistrationFetcher {
    http_client: reqwest::Client,
    gateway: String,
}

impl Default for RegistrationFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_IPFS_GATEWAY)
    }
}

impl RegistrationFetcher {
    pub fn new(gateway: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self::with_client(http_client, gateway)
    }

    pub fn with_client(http_client: reqwest::Client, gateway: impl Into<String>) -> Self {
        Self {
            http_client,
            gateway: gateway.into(),
        }
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Download and parse the registration file behind `uri`.
    ///
    /// The content is not checked against on-chain state.
    pub async fn fetch(&self, uri: &str) -> Result<RegistrationFile> {
        let url = resolve_uri(uri, &self.gateway)?;
        debug!("Fetching registration file from {}", url);

        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Erc8004Error::MetadataFetchFailed(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let body = response.text().await?;
        let file: RegistrationFile = serde_json::from_str(&body).map_err(|e| {
            Erc8004Error::MetadataFetchFailed(format!("Invalid registration JSON at {}: {}", url, e))
        })?;

        info!(
            "Fetched registration file '{}' ({} endpoints)",
            file.name.as_deref().unwrap_or("unnamed"),
            file.endpoints.len()
        );
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_resolve_uri() {
        assert_eq!(
            resolve_uri("ipfs://QmHash/agent.json", DEFAULT_IPFS_GATEWAY).unwrap(),
            "https://ipfs.io/ipfs/QmHash/agent.json"
        );
        assert_eq!(
            resolve_uri("ipfs://ipfs/QmHash", "https://gw.example/ipfs/").unwrap(),
            "https://gw.example/ipfs/QmHash"
        );
        assert_eq!(
            resolve_uri("https://agent.example/reg.json", DEFAULT_IPFS_GATEWAY).unwrap(),
            "https://agent.example/reg.json"
        );
        assert!(matches!(
            resolve_uri("ar://tx", DEFAULT_IPFS_GATEWAY).unwrap_err(),
            Erc8004Error::UnsupportedUriScheme(_)
        ));
        assert!(matches!(
            resolve_uri("data:application/json;base64,e30=", DEFAULT_IPFS_GATEWAY).unwrap_err(),
            Erc8004Error::UnsupportedUriScheme(_)
        ));
        assert!(resolve_uri("ipfs://", DEFAULT_IPFS_GATEWAY).is_err());
    }

    #[tokio::test]
    async fn test_fetch_via_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ipfs/QmAgent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "https://eips.ethereum.org/EIPS/eip-8004#registration-v1",
                "name": "Weather Bot",
                "description": "Forecasts",
                "image": "ipfs://QmImage",
                "endpoints": [{"name": "A2A", "endpoint": "https://bot.example/a2a", "version": "0.3.0"}],
                "registrations": [{"agentId": 7, "agentRegistry": "eip155:11155111:0x8004A818BFB912233c491871b3d84c89A494BD9e"}],
                "supportedTrust": ["reputation"],
                "extra": true
            })))
            .mount(&server)
            .await;

        let fetcher = RegistrationFetcher::new(format!("{}/ipfs", server.uri()));
        let file = fetcher.fetch("ipfs://QmAgent").await.unwrap();
        assert_eq!(file.name.as_deref(), Some("Weather Bot"));
        assert_eq!(file.endpoints[0].name, "A2A");
        assert!(file.has_valid_type());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = RegistrationFetcher::default();
        let err = fetcher
            .fetch(&format!("{}/missing.json", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, Erc8004Error::MetadataFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = RegistrationFetcher::default();
        let err = fetcher.fetch(&server.uri()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid registration JSON"));
    }
}
