use reqwest::Client;
use tracing::debug;

use crate::MirrorConfig;

/// Create the shared reqwest client used for metadata and asset requests.
///
/// Per-request timeouts are applied at call sites: metadata fetches and asset
/// transfers need very different budgets, so the client itself only carries
/// the connect timeout.
pub fn create_client(config: &MirrorConfig) -> Result<Client, reqwest::Error> {
    debug!(
        connect_timeout = ?config.connect_timeout,
        user_agent = %config.user_agent,
        "Building HTTP client"
    );

    Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .connect_timeout(config.connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
}
