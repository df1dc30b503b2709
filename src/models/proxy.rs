use serde::{Deserialize, Serialize};
use url::Url;

/// Proxy protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    #[default]
    Http,
    Socks4,
    Socks5,
}

impl ProxyProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Socks4 => "socks4",
            ProxyProtocol::Socks5 => "socks5",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            // Listed "https" proxies are plain HTTP proxies that tunnel TLS
            // with CONNECT; the client must not speak TLS to the proxy itself.
            "http" | "https" => Some(ProxyProtocol::Http),
            "socks4" => Some(ProxyProtocol::Socks4),
            "socks5" | "socks5h" => Some(ProxyProtocol::Socks5),
            _ => None,
        }
    }

}

impl std::fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A forward proxy usable for both plain and TLS traffic.
///
/// The address is always scheme-qualified (`http://1.2.3.4:8080`). There is
/// no identity beyond the string, and duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyCandidate {
    address: String,
}

impl ProxyCandidate {
    /// Parse a provider entry such as `1.2.3.4:8080` or `socks5://host:1080`.
    ///
    /// Entries without a scheme get `default_protocol`. Returns `None` for
    /// anything that is not a host with an explicit port.
    pub fn parse(raw: &str, default_protocol: ProxyProtocol) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let qualified = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("{}://{}", default_protocol.as_str(), raw)
        };

        let url = Url::parse(&qualified).ok()?;
        let protocol = ProxyProtocol::from_str(url.scheme())?;
        let host = url.host_str()?;
        let port = url.port()?;

        if !(url.path().is_empty() || url.path() == "/") {
            return None;
        }

        Some(Self {
            address: format!("{}://{}:{}", protocol.as_str(), host, port),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl std::fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}
