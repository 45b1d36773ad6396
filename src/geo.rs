//! Geolocation enrichment for a static proxy list
//!
//! Reads `host:port` lines, looks up each host on ipinfo.io and writes a
//! `<stem>_with_city.json` report next to the input. Lookups never fail the
//! job; anything unresolved becomes `"Unknown, Unknown"`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeoConfig;

pub const UNKNOWN_LOCATION: &str = "Unknown, Unknown";

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedProxy {
    pub proxy: String,
    pub location: String,
}

#[derive(Debug, Deserialize)]
struct IpInfo {
    city: Option<String>,
    country: Option<String>,
}

impl IpInfo {
    fn location(&self) -> String {
        format!(
            "{}, {}",
            self.city.as_deref().unwrap_or("Unknown"),
            self.country.as_deref().unwrap_or("Unknown")
        )
    }
}

/// ipinfo.io client
pub struct GeoLocator {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GeoLocator {
    pub fn new(config: &GeoConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.api_key.clone(),
        })
    }

    /// "City, CC" for an address
    pub async fn locate(&self, ip: &str) -> String {
        let Some(token) = &self.token else {
            return UNKNOWN_LOCATION.to_string();
        };

        match self.lookup(ip, token).await {
            Ok(info) => info.location(),
            Err(e) => {
                debug!("Location lookup for {} failed: {:#}", ip, e);
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    async fn lookup(&self, ip: &str, token: &str) -> anyhow::Result<IpInfo> {
        let url = format!("{}/{}/json", self.base_url, ip);
        let info = self
            .client
            .get(url)
            .query(&[("token", token)])
            .send()
            .await?
            .json::<IpInfo>()
            .await?;
        Ok(info)
    }
}

/// Output path for an input list: `proxies.txt` -> `proxies_with_city.json`
pub fn report_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proxies".to_string());
    input.with_file_name(format!("{}_with_city.json", stem))
}

/// Annotate every `host:port` line of `input` and write the report.
///
/// Returns the report path.
pub async fn annotate_file(locator: &GeoLocator, input: &Path) -> anyhow::Result<PathBuf> {
    if !input.is_file() {
        bail!("File '{}' not found!", input.display());
    }

    let content = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut entries = Vec::new();
    for line in content.lines() {
        let proxy = line.trim();
        let Some((host, _)) = proxy.split_once(':') else {
            if !proxy.is_empty() {
                warn!("Skipping line without ':' {:?}", proxy);
            }
            continue;
        };

        let entry = LocatedProxy {
            proxy: proxy.to_string(),
            location: locator.locate(host).await,
        };
        info!(proxy = %entry.proxy, location = %entry.location, "Located proxy");
        entries.push(entry);
    }

    let output = report_path(input);
    let json = serde_json::to_vec_pretty(&entries)?;
    tokio::fs::write(&output, json)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!("Results saved in: {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn config(api_key: Option<&str>, url: String) -> GeoConfig {
        GeoConfig {
            api_key: api_key.map(str::to_string),
            url,
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path(Path::new("/data/proxies.txt")),
            PathBuf::from("/data/proxies_with_city.json")
        );
        assert_eq!(
            report_path(Path::new("list")),
            PathBuf::from("list_with_city.json")
        );
    }

    #[test]
    fn test_location_formatting() {
        let info: IpInfo =
            serde_json::from_str(r#"{"ip": "1.1.1.1", "city": "Sydney", "country": "AU"}"#)
                .unwrap();
        assert_eq!(info.location(), "Sydney, AU");

        let info: IpInfo = serde_json::from_str(r#"{"ip": "10.0.0.1", "bogon": true}"#).unwrap();
        assert_eq!(info.location(), UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn test_missing_token_is_unknown() {
        let locator = GeoLocator::new(&config(None, "https://ipinfo.io".into())).unwrap();
        assert_eq!(locator.locate("1.1.1.1").await, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unknown() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let locator = GeoLocator::new(&config(Some("token"), format!("http://{}", addr))).unwrap();
        assert_eq!(locator.locate("1.1.1.1").await, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn test_annotate_file_writes_report() {
        let dir = TempDir::new("sockguard").unwrap();
        let input = dir.path().join("proxies.txt");
        std::fs::write(&input, "10.0.0.1:1080\nno separator\n\n10.0.0.2:9050\n").unwrap();

        let locator = GeoLocator::new(&config(None, "https://ipinfo.io".into())).unwrap();
        let output = annotate_file(&locator, &input).await.unwrap();

        assert_eq!(output, dir.path().join("proxies_with_city.json"));
        let report: Vec<LocatedProxy> =
            serde_json::from_slice(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(
            report,
            vec![
                LocatedProxy {
                    proxy: "10.0.0.1:1080".into(),
                    location: UNKNOWN_LOCATION.into(),
                },
                LocatedProxy {
                    proxy: "10.0.0.2:9050".into(),
                    location: UNKNOWN_LOCATION.into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_annotate_missing_file_fails() {
        let locator = GeoLocator::new(&config(None, "https://ipinfo.io".into())).unwrap();
        let err = annotate_file(&locator, Path::new("/nonexistent/proxies.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
