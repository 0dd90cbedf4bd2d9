//! Router local management API (RCI)

use crate::error::{ManagerError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::trace;

/// Subset of `show interface` output the manager cares about
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceInfo {
    #[serde(default)]
    pub address: String,
}

impl InterfaceInfo {
    /// Configured IPv4 address, if any
    pub fn ipv4(&self) -> Option<&str> {
        let address = self.address.trim();
        (!address.is_empty()).then_some(address)
    }
}

#[derive(Debug, Clone)]
pub struct RciClient {
    base_url: String,
    http: reqwest::Client,
}

impl RciClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: super::build_http_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /rci/show/interface/{name}`
    pub async fn show_interface(&self, name: &str) -> Result<InterfaceInfo> {
        let url = format!("{}/rci/show/interface/{}", self.base_url, name);
        trace!(url = %url, "RCI request");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ManagerError::protocol(format!(
                "RCI returned {status} for interface {name}"
            )));
        }

        let body = response.bytes().await?;
        let info = serde_json::from_slice(&body)?;
        Ok(info)
    }
}
