//! # Notification Ingester
//!
//! Validates inbound release webhooks and hands accepted ones to the
//! [`RefreshCoordinator`]. Gates run in order: method, signature, event type,
//! payload, action, de-duplication, dispatch.

use std::time::Duration;

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use http::Method;
use parking_lot::Mutex;
use serde::Deserialize;
use sha2::Sha256;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::coordinator::{RefreshCoordinator, RefreshTrigger};
use crate::error::IngestError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";

/// Repeated notifications for the same tag inside this window are skipped.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(60);

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check a `sha256=<hex>` signature of `body` keyed by `secret`, in constant time.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Some(hex_sig) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature header value for `body`, as a sender would.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret)?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Last accepted notification, guarded by a single lock.
#[derive(Debug)]
pub struct DedupWindow {
    window: Duration,
    last: Mutex<Option<(String, Instant)>>,
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEDUP_WINDOW)
    }
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Record `tag` as accepted now, unless it duplicates the last acceptance.
    pub fn check_and_record(&self, tag: &str) -> bool {
        self.check_and_record_at(tag, Instant::now())
    }

    pub fn check_and_record_at(&self, tag: &str, now: Instant) -> bool {
        let mut last = self.last.lock();
        if let Some((last_tag, accepted_at)) = last.as_ref() {
            let elapsed = now.saturating_duration_since(*accepted_at);
            if last_tag == tag && elapsed < self.window {
                debug!(tag, elapsed_secs = elapsed.as_secs(), "Duplicate notification");
                return false;
            }
        }
        *last = Some((tag.to_owned(), now));
        true
    }
}

/// The parts of an inbound webhook request the ingester looks at.
#[derive(Debug, Clone, Copy)]
pub struct InboundNotification<'a> {
    pub method: &'a Method,
    pub event: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A refresh was dispatched for this tag
    Accepted { tag: String },
    Ignored { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    release: Option<PayloadRelease>,
}

#[derive(Debug, Deserialize)]
struct PayloadRelease {
    #[serde(default)]
    tag_name: Option<String>,
}

pub struct NotificationIngester {
    secret: Option<Vec<u8>>,
    window: DedupWindow,
    coordinator: RefreshCoordinator,
}

impl NotificationIngester {
    /// An empty secret disables signature checking (open mode).
    pub fn new(secret: Option<String>, coordinator: RefreshCoordinator) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(String::into_bytes),
            window: DedupWindow::default(),
            coordinator,
        }
    }

    pub fn ingest(&self, notification: InboundNotification<'_>) -> Result<IngestOutcome, IngestError> {
        if *notification.method != Method::POST {
            return Err(IngestError::MethodNotAllowed);
        }

        if let Some(secret) = &self.secret {
            let signature = notification.signature.unwrap_or_default();
            if !verify_signature(secret, notification.body, signature) {
                warn!(
                    has_signature = notification.signature.is_some(),
                    "Rejected webhook with invalid signature"
                );
                return Err(IngestError::Unauthorized);
            }
        }

        if notification.event != Some("release") {
            return Ok(IngestOutcome::Ignored {
                reason: "not a release event".to_owned(),
            });
        }

        let payload: Payload = serde_json::from_slice(notification.body)
            .map_err(|e| IngestError::BadRequest(format!("failed to parse payload: {e}")))?;

        let action = payload.action.unwrap_or_default();
        if action != "published" {
            return Ok(IngestOutcome::Ignored {
                reason: format!("action is {action}"),
            });
        }

        let tag = payload
            .release
            .and_then(|r| r.tag_name)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| IngestError::BadRequest("missing release tag".to_owned()))?;

        if !self.window.check_and_record(&tag) {
            info!(tag = %tag, "Skipping duplicate release webhook");
            return Ok(IngestOutcome::Skipped {
                reason: "duplicate request".to_owned(),
            });
        }

        info!(tag = %tag, "Received release webhook");
        self.coordinator
            .trigger(RefreshTrigger::Notification { tag: tag.clone() });

        Ok(IngestOutcome::Accepted { tag })
    }
}
