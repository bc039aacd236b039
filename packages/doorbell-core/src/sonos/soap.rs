//! SOAP transport for UPnP control of Sonos speakers.
//!
//! Builds the envelope, posts it to the speaker's control endpoint and turns
//! faults into [`SoapError`]. Individual commands live in `playback.rs`,
//! `volume.rs`, `grouping.rs` and `zone_groups.rs`.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::utils::{build_sonos_url, escape_xml, extract_xml_text};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during SOAP operations with Sonos speakers.
#[derive(Debug, Error)]
pub enum SoapError {
    /// HTTP request to the speaker failed (unreachable, timeout, reset).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker returned a non-success HTTP status without a SOAP fault.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Speaker returned a SOAP fault response.
    #[error("SOAP fault: {0}")]
    Fault(String),

    /// Response did not contain the expected values.
    #[error("Failed to parse SOAP response")]
    Parse,
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

impl SoapError {
    /// Returns the UPnP error code of a fault, if one is present.
    #[must_use]
    pub fn upnp_error_code(&self) -> Option<u16> {
        match self {
            Self::Fault(detail) => detail
                .split(|c: char| !c.is_ascii_digit())
                .find(|digits| digits.len() == 3)
                .and_then(|digits| digits.parse().ok()),
            _ => None,
        }
    }

    /// Returns true if the speaker is likely to accept the same request shortly.
    ///
    /// Transient Sonos SOAP fault codes:
    /// - 701: Transition not available (device changing states)
    /// - 714: Illegal seek target (previous source still loading)
    /// - 716: Resource not found (device busy initializing)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fault(_) => matches!(self.upnp_error_code(), Some(701 | 714 | 716)),
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope and Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a single-line SOAP envelope.
///
/// Sonos rejects envelopes with whitespace before the root element, so no
/// pretty-printing here.
fn build_envelope(service: SonosService, action: &str, args: &[(&str, String)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{urn}">"#,
        action = action,
        urn = service.urn(),
    );
    for (name, value) in args {
        body.push_str(&format!("<{name}>{}</{name}>", escape_xml(value)));
    }
    body.push_str(&format!("</u:{action}></s:Body></s:Envelope>"));
    body
}

/// Posts one SOAP action to a speaker and returns the raw response body.
async fn post_action(
    client: &Client,
    ip: &str,
    service: SonosService,
    action: &str,
    args: &[(&str, String)],
) -> SoapResult<String> {
    let url = build_sonos_url(ip, service.control_path());
    let body = build_envelope(service, action, args);

    log::debug!("[SOAP] {} -> {}", action, url);
    log::trace!("[SOAP] Request body: {}", body);

    let started = std::time::Instant::now();
    let response = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    log::debug!(
        "[SOAP] {} on {} answered {} in {:?}",
        action,
        ip,
        status,
        started.elapsed()
    );

    // Faults arrive with HTTP 500, so look for them before the status check.
    if text.contains(":Fault>") {
        let detail = extract_xml_text(&text, "errorCode")
            .map(|code| format!("UPnP error {code}"))
            .or_else(|| extract_xml_text(&text, "faultstring"))
            .unwrap_or_else(|| "unknown fault".to_string());
        return Err(SoapError::Fault(detail));
    }

    if !status.is_success() {
        return Err(SoapError::HttpStatus(status.as_u16(), text));
    }

    Ok(text)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent builder for a single SOAP action.
///
/// # Example
/// ```ignore
/// SoapRequestBuilder::new(&client, "192.168.1.100")
///     .service(SonosService::AVTransport)
///     .action("Seek")
///     .instance_id()
///     .arg("Unit", "REL_TIME")
///     .arg("Target", "0:01:30")
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    client: &'a Client,
    ip: &'a str,
    service: Option<SonosService>,
    action: Option<&'a str>,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    #[must_use]
    pub fn new(client: &'a Client, ip: &'a str) -> Self {
        Self {
            client,
            ip,
            service: None,
            action: None,
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn service(mut self, service: SonosService) -> Self {
        self.service = Some(service);
        self
    }

    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    /// Appends an argument; order is preserved in the envelope.
    #[must_use]
    pub fn arg(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.args.push((name, value.into()));
        self
    }

    /// Appends the `InstanceID=0` argument most Sonos actions require.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Sends the request and returns the response body.
    ///
    /// # Errors
    /// Returns `SoapError` if the service or action is missing, or if the
    /// request fails.
    pub async fn send(self) -> SoapResult<String> {
        let (service, action) = match (self.service, self.action) {
            (Some(service), Some(action)) => (service, action),
            _ => {
                return Err(SoapError::Fault(
                    "SoapRequestBuilder: service and action are required".into(),
                ))
            }
        };
        post_action(self.client, self.ip, service, action, &self.args).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(SonosService, &'a str, Vec<(&'a str, String)>)> {
        Some((self.service?, self.action?, self.args))
    }
}
