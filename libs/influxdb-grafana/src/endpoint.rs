//! Service endpoints and discovery collaborators.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

/// URL scheme of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Well-known port of the scheme.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("unknown protocol '{other}', expected http or https")),
        }
    }
}

/// Network location of a service behind a VIP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoint {
    pub protocol: Protocol,
    pub virtual_ip: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(protocol: Protocol, virtual_ip: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            virtual_ip: virtual_ip.into(),
            port,
        }
    }

    /// URL of `path` on this endpoint (`path` has no leading slash).
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}://{}:{}/{}",
            self.protocol, self.virtual_ip, self.port, path
        )
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url(""))
    }
}

/// Locates cluster services.
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// VIP address of the named service.
    async fn vip_address(&self, name: &str) -> anyhow::Result<String>;

    /// Protocol the cluster serves its dashboards with.
    async fn http_protocol(&self) -> anyhow::Result<Protocol>;
}

/// Discovery from a fixed VIP table.
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    vips: HashMap<String, String>,
    protocol: Protocol,
}

impl StaticDiscovery {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            vips: HashMap::new(),
            protocol,
        }
    }

    pub fn with_vip(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.vips.insert(name.into(), address.into());
        self
    }
}

#[async_trait]
impl ServiceDiscovery for StaticDiscovery {
    async fn vip_address(&self, name: &str) -> anyhow::Result<String> {
        self.vips
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no VIP named '{name}'"))
    }

    async fn http_protocol(&self) -> anyhow::Result<Protocol> {
        Ok(self.protocol)
    }
}
