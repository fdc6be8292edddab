use tracing::debug;

use crate::{config::ClientConfig, error::Result};

const HEALTHY_BODY: &str = "Healthy";

/// Ask the backend's `/health` route whether it is up.
///
/// Transport failures are errors; a reachable backend answering anything
/// other than 2xx `Healthy` is reported as `Ok(false)`.
pub async fn check_health(config: &ClientConfig) -> Result<bool> {
    let url = config.health_url()?;
    let response = reqwest::Client::new().get(url.clone()).send().await?;
    let status = response.status();
    let body = response.text().await?;
    debug!(%url, %status, "health check");

    Ok(status.is_success() && body.trim().trim_matches('"') == HEALTHY_BODY)
}
