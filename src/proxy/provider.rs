//! Proxy-list providers
//!
//! Providers are unauthenticated HTTP endpoints that return lists of
//! `host:port` entries. They are untrusted and individually optional: a
//! provider that fails is logged and skipped by the caller.

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::models::{ProxyCandidate, ProxyProtocol};

const PROXYSCRAPE_HTTP_URL: &str = "https://api.proxyscrape.com/v4/free-proxy-list/get?request=display_proxies&proxy_format=ipport&format=text&protocol=http";
const SPEEDX_HTTP_URL: &str =
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt";
const GEONODE_HTTPS_URL: &str = "https://proxylist.geonode.com/api/proxy-list?limit=100&page=1&sort_by=lastChecked&sort_type=desc&protocols=https";

/// Body format of a provider response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// One `host:port` (optionally scheme-qualified) per line
    PlainText,
    /// `{"data": [{"ip": .., "port": .., "protocols": [..]}]}`
    GeonodeJson,
}

impl ListFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" | "plaintext" => Some(Self::PlainText),
            "geonode" | "json" => Some(Self::GeonodeJson),
            _ => None,
        }
    }
}

/// Where and how to query one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub format: ListFormat,
    pub url: Url,
}

impl ProviderSpec {
    /// Parse `text=URL`, `geonode=URL` or a bare URL (plain text).
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        let (format, url) = match raw.split_once('=') {
            Some((prefix, rest)) if !prefix.contains("://") && !prefix.contains('?') => {
                let format = ListFormat::from_str(prefix)
                    .ok_or_else(|| format!("unknown provider format: {}", prefix))?;
                (format, rest)
            }
            _ => (ListFormat::PlainText, raw),
        };

        let url = Url::parse(url.trim()).map_err(|e| format!("invalid provider URL: {}", e))?;
        Ok(Self { format, url })
    }

    pub fn defaults() -> Vec<Self> {
        [
            (ListFormat::PlainText, PROXYSCRAPE_HTTP_URL),
            (ListFormat::PlainText, SPEEDX_HTTP_URL),
            (ListFormat::GeonodeJson, GEONODE_HTTPS_URL),
        ]
        .into_iter()
        .filter_map(|(format, url)| Url::parse(url).ok().map(|url| Self { format, url }))
        .collect()
    }
}

/// A source of proxy candidates
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Query the provider once and parse its response
    async fn fetch(&self) -> anyhow::Result<Vec<ProxyCandidate>>;
}

/// Provider backed by a plain HTTP GET
pub struct HttpListProvider {
    name: String,
    spec: ProviderSpec,
    client: reqwest::Client,
}

impl HttpListProvider {
    pub fn new(client: reqwest::Client, spec: ProviderSpec) -> Self {
        let name = spec.url.host_str().unwrap_or("provider").to_string();
        Self { name, spec, client }
    }
}

#[async_trait]
impl ProxyProvider for HttpListProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<ProxyCandidate>> {
        let response = self
            .client
            .get(self.spec.url.clone())
            .send()
            .await
            .with_context(|| format!("requesting {}", self.spec.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{} returned {}", self.name, status);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("reading body from {}", self.name))?;

        match self.spec.format {
            ListFormat::PlainText => Ok(parse_plain_text(&body)),
            ListFormat::GeonodeJson => parse_geonode(&body),
        }
    }
}

/// Parse a newline separated list; malformed lines are skipped.
pub fn parse_plain_text(body: &str) -> Vec<ProxyCandidate> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| ProxyCandidate::parse(line, ProxyProtocol::Http))
        .collect()
}

#[derive(Debug, Deserialize)]
struct GeonodeResponse {
    #[serde(default)]
    data: Vec<GeonodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeonodeEntry {
    ip: String,
    port: Value,
    #[serde(default)]
    protocols: Vec<String>,
}

/// Parse the geonode proxy-list API response.
pub fn parse_geonode(body: &str) -> anyhow::Result<Vec<ProxyCandidate>> {
    let response: GeonodeResponse =
        serde_json::from_str(body).context("parsing geonode response")?;

    let candidates = response
        .data
        .into_iter()
        .filter_map(|entry| {
            let port = match entry.port {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let protocol = entry
                .protocols
                .first()
                .and_then(|p| ProxyProtocol::from_str(p))
                .unwrap_or_default();
            ProxyCandidate::parse(&format!("{}:{}", entry.ip, port), protocol)
        })
        .collect();

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_skips_noise() {
        let body = "1.1.1.1:80\n\n# comment\nnot-a-proxy\n2.2.2.2:3128\r\nsocks5://3.3.3.3:1080\n";
        let candidates = parse_plain_text(body);

        let addresses: Vec<&str> = candidates.iter().map(|c| c.address()).collect();
        assert_eq!(
            addresses,
            vec![
                "http://1.1.1.1:80",
                "http://2.2.2.2:3128",
                "socks5://3.3.3.3:1080"
            ]
        );
    }

    #[test]
    fn test_parse_plain_text_keeps_duplicates() {
        let candidates = parse_plain_text("1.1.1.1:80\n1.1.1.1:80\n");
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_geonode() {
        let body = r#"{
            "data": [
                {"ip": "4.4.4.4", "port": "8080", "protocols": ["https"]},
                {"ip": "5.5.5.5", "port": 1080, "protocols": ["socks5"]},
                {"ip": "6.6.6.6", "port": null, "protocols": ["http"]},
                {"ip": "7.7.7.7", "port": "3128"}
            ],
            "total": 4
        }"#;

        let candidates = parse_geonode(body).unwrap();
        let addresses: Vec<&str> = candidates.iter().map(|c| c.address()).collect();
        assert_eq!(
            addresses,
            vec![
                "http://4.4.4.4:8080",
                "socks5://5.5.5.5:1080",
                "http://7.7.7.7:3128"
            ]
        );
    }

    #[test]
    fn test_parse_geonode_https_entries_use_http_scheme() {
        let body = r#"{"data": [
            {"ip": "8.8.4.4", "port": "443", "protocols": ["https"]},
            {"ip": "9.9.9.9", "port": "1080", "protocols": ["socks4"]}
        ]}"#;

        let candidates = parse_geonode(body).unwrap();
        let addresses: Vec<&str> = candidates.iter().map(|c| c.address()).collect();
        assert_eq!(addresses, vec!["http://8.8.4.4:443", "socks4://9.9.9.9:1080"]);
    }

    #[test]
    fn test_parse_geonode_rejects_garbage() {
        assert!(parse_geonode("<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_provider_spec_parse() {
        let spec = ProviderSpec::parse("geonode=https://example.com/api?limit=10").unwrap();
        assert_eq!(spec.format, ListFormat::GeonodeJson);
        assert_eq!(spec.url.as_str(), "https://example.com/api?limit=10");

        let spec = ProviderSpec::parse("https://example.com/list.txt?a=b").unwrap();
        assert_eq!(spec.format, ListFormat::PlainText);
        assert_eq!(spec.url.as_str(), "https://example.com/list.txt?a=b");

        assert!(ProviderSpec::parse("csv=https://example.com").is_err());
        assert!(ProviderSpec::parse("not a url").is_err());
    }

    #[test]
    fn test_default_specs_are_valid() {
        assert_eq!(ProviderSpec::defaults().len(), 3);
    }
}
