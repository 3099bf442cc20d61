//! Outbound email dispatch and password-reset deep links.
//!
//! Email goes through an HTTP function endpoint on the backend and is
//! fire-and-forget: the send is spawned, failures are logged and never
//! surfaced to the caller.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

/// URL scheme the mobile app registers for deep links.
pub const DEEP_LINK_SCHEME: &str = "hrdesk";

/// An outbound email message.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
  pub to: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub from: Option<String>,
  pub subject: String,
  pub html: String,
}

/// A parsed password-reset deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
  pub email: String,
  pub token: String,
}

/// Client for the backend's email function endpoint.
#[derive(Clone)]
pub struct Mailer {
  http: reqwest::Client,
  endpoint: Url,
  token: String,
  sender: Option<String>,
}

impl Mailer {
  pub fn new(config: &Config) -> Result<Self> {
    let base = Url::parse(&config.backend.url)
      .map_err(|e| eyre!("Invalid backend URL {}: {}", config.backend.url, e))?;
    let endpoint = base
      .join("functions/v1/send-email")
      .map_err(|e| eyre!("Invalid email endpoint: {}", e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      endpoint,
      token: Config::api_token()?,
      sender: config.backend.sender_email.clone(),
    })
  }

  /// Send an email, best-effort. Returns immediately; the request runs in
  /// the background and a failure only produces a log line. The handle is
  /// returned so short-lived callers (the CLI) can wait for the attempt.
  pub fn send(&self, message: EmailMessage) -> tokio::task::JoinHandle<()> {
    let http = self.http.clone();
    let endpoint = self.endpoint.clone();
    let token = self.token.clone();

    tokio::spawn(async move {
      let result = http
        .post(endpoint)
        .bearer_auth(token)
        .json(&message)
        .send()
        .await;

      match result {
        Ok(response) if response.status().is_success() => {
          debug!(to = %message.to, "email dispatched");
        }
        Ok(response) => {
          warn!(to = %message.to, status = %response.status(), "email dispatch rejected");
        }
        Err(err) => {
          warn!(to = %message.to, error = %err, "email dispatch failed");
        }
      }
    })
  }

  /// Send a password-reset email containing the deep link.
  pub fn send_password_reset(&self, email: &str, reset_token: &str) -> tokio::task::JoinHandle<()> {
    let link = reset_link(email, reset_token);
    self.send(EmailMessage {
      to: email.to_string(),
      from: self.sender.clone(),
      subject: "Reset your password".to_string(),
      html: format!(
        "<p>A password reset was requested for this address.</p>\
         <p><a href=\"{}\">Open the app to choose a new password</a></p>\
         <p>If you did not request this, you can ignore this email.</p>",
        link
      ),
    })
  }
}

/// Generate an opaque single-use reset token. The backend function records
/// it alongside the request; the app presents it back via the deep link.
pub fn new_reset_token(email: &str) -> String {
  use sha2::{Digest, Sha256};

  let mut hasher = Sha256::new();
  hasher.update(email.as_bytes());
  hasher.update(
    chrono::Utc::now()
      .timestamp_nanos_opt()
      .unwrap_or_default()
      .to_le_bytes(),
  );
  let digest = hasher.finalize();
  hex::encode(&digest[..16])
}

/// Build a password-reset deep link, e.g.
/// `hrdesk://reset-password?email=ann%40example.com&token=abc`.
pub fn reset_link(email: &str, token: &str) -> String {
  let query: String = url::form_urlencoded::Serializer::new(String::new())
    .append_pair("email", email)
    .append_pair("token", token)
    .finish();
  format!("{}://reset-password?{}", DEEP_LINK_SCHEME, query)
}

/// Parse an inbound password-reset deep link.
pub fn parse_reset_link(link: &str) -> Result<ResetRequest> {
  let url = Url::parse(link).map_err(|e| eyre!("Invalid deep link: {}", e))?;

  if url.scheme() != DEEP_LINK_SCHEME || url.host_str() != Some("reset-password") {
    return Err(eyre!("Not a password-reset link: {}", link));
  }

  let mut email = None;
  let mut token = None;
  for (k, v) in url.query_pairs() {
    match k.as_ref() {
      "email" => email = Some(v.into_owned()),
      "token" => token = Some(v.into_owned()),
      _ => {}
    }
  }

  Ok(ResetRequest {
    email: email.ok_or_else(|| eyre!("Reset link missing email"))?,
    token: token.ok_or_else(|| eyre!("Reset link missing token"))?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_reset_link_roundtrip() {
    let link = reset_link("ann@example.com", "tok123");
    let parsed = parse_reset_link(&link).unwrap();
    assert_eq!(
      parsed,
      ResetRequest {
        email: "ann@example.com".to_string(),
        token: "tok123".to_string(),
      }
    );
  }

  #[test]
  fn test_reset_link_encodes_email() {
    let link = reset_link("ann+hr@example.com", "t");
    assert!(link.starts_with("hrdesk://reset-password?"));
    assert!(!link.contains('+') || link.contains("%2B"));
  }

  #[test]
  fn test_reset_tokens_are_opaque_hex() {
    let token = new_reset_token("ann@example.com");
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn test_parse_rejects_other_schemes() {
    assert!(parse_reset_link("https://example.com/reset-password?email=a&token=b").is_err());
  }

  #[test]
  fn test_parse_rejects_missing_token() {
    assert!(parse_reset_link("hrdesk://reset-password?email=a").is_err());
  }
}
