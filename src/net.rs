//! Cheap connectivity probe for offline detection.

use color_eyre::{eyre::eyre, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// How long a probe verdict is reused before re-checking.
const PROBE_MEMO: Duration = Duration::from_secs(5);

/// Timeout for the probe request itself. Connectivity checks must be cheap;
/// a slow link counts as online.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connectivity probe against the backend base URL.
///
/// Issues a HEAD request with a short timeout and memoizes the verdict for a
/// few seconds so list screens that fire several reads in a row only pay for
/// one probe.
pub struct NetworkProbe {
  http: reqwest::Client,
  endpoint: Url,
  last: Mutex<Option<(Instant, bool)>>,
}

impl NetworkProbe {
  /// Create a probe for the given backend base URL.
  pub fn new(base_url: &str) -> Result<Self> {
    let endpoint =
      Url::parse(base_url).map_err(|e| eyre!("Invalid backend URL {}: {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(PROBE_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to build probe client: {}", e))?;

    Ok(Self {
      http,
      endpoint,
      last: Mutex::new(None),
    })
  }

  /// Whether the backend looks reachable. Memoized for a few seconds.
  pub async fn is_online(&self) -> bool {
    if let Some(verdict) = self.memoized() {
      return verdict;
    }

    let online = self
      .http
      .head(self.endpoint.clone())
      .send()
      .await
      .is_ok();
    debug!(online, "connectivity probe");

    if let Ok(mut last) = self.last.lock() {
      *last = Some((Instant::now(), online));
    }
    online
  }

  fn memoized(&self) -> Option<bool> {
    let last = self.last.lock().ok()?;
    let (at, verdict) = (*last)?;
    if at.elapsed() < PROBE_MEMO {
      Some(verdict)
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rejects_invalid_url() {
    assert!(NetworkProbe::new("not a url").is_err());
  }

  #[tokio::test]
  async fn test_unreachable_host_is_offline() {
    // Reserved TEST-NET-1 address, nothing listens there
    let probe = NetworkProbe::new("http://192.0.2.1:9").unwrap();
    assert!(!probe.is_online().await);
  }

  #[tokio::test]
  async fn test_verdict_is_memoized() {
    let probe = NetworkProbe::new("http://192.0.2.1:9").unwrap();
    let _ = probe.is_online().await;
    assert_eq!(probe.memoized(), Some(false));
  }
}
