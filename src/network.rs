//! Connectivity checks and remote lookups

use std::net::ToSocketAddrs;

use log::{debug, warn};
use serde::Deserialize;

use crate::config::{APP_NAME, APP_VERSION, CONNECTIVITY_PROBE_HOST, LATEST_RELEASE_API_URL, PUBLIC_IP_URL};
use crate::error::{AppError, AppResult};

/// HTTP client shared by every remote lookup
pub fn http_client() -> AppResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(format!("{}/{}", APP_NAME, APP_VERSION))
        .build()?)
}

/// True when the probe host resolves
pub fn is_online() -> bool {
    match CONNECTIVITY_PROBE_HOST.to_socket_addrs() {
        Ok(mut addrs) => addrs.next().is_some(),
        Err(e) => {
            warn!("Connectivity probe failed: {}", e);
            false
        }
    }
}

/// Fail with a connectivity error when offline
pub fn ensure_online() -> AppResult<()> {
    if is_online() {
        Ok(())
    } else {
        Err(AppError::Connectivity)
    }
}

#[derive(Deserialize)]
struct IpResponse {
    ip: String,
}

/// The machine's public IP address
pub async fn public_ip(client: &reqwest::Client) -> AppResult<String> {
    let response: IpResponse = client.get(PUBLIC_IP_URL).send().await?.error_for_status()?.json().await?;
    Ok(response.ip)
}

#[derive(Deserialize)]
struct ReleaseResponse {
    tag_name: String,
}

/// Latest published downloader version, e.g. `2025.06.30`
pub async fn latest_downloader_version(client: &reqwest::Client) -> AppResult<String> {
    let release: ReleaseResponse = client
        .get(LATEST_RELEASE_API_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    debug!("Latest release tag: {}", release.tag_name);
    Ok(release.tag_name.trim().to_string())
}
