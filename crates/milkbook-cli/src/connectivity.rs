//! Reachability probe feeding the engine's connectivity signal

use std::time::Duration;

use milkbook_core::ConnectivitySignal;

const PROBE_TIMEOUT_SECS: u64 = 5;

pub struct EndpointProbe {
    endpoint: String,
    client: reqwest::Client,
}

impl EndpointProbe {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .build()?,
        })
    }

    /// Any HTTP answer counts as online, whatever its status
    pub async fn is_reachable(&self) -> bool {
        match self.client.head(&self.endpoint).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!(%error, endpoint = %self.endpoint, "Endpoint unreachable");
                false
            }
        }
    }

    /// Probe every `interval` and report the result; runs until dropped
    pub async fn run(&self, signal: &ConnectivitySignal, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            signal.set_online(self.is_reachable().await);
        }
    }
}
