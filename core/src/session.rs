//! # HMC Session
//!
//! One authenticated connection to a management host.
//!
//! A [`Session`] is opened with a logon handshake and holds the opaque
//! `X-API-Session` token for all subsequent requests. Logoff is attempted
//! exactly once per opened session: either through an explicit
//! [`Session::close`] or, failing that, through the `Drop` fallback, so a
//! server-side session slot is never leaked on an abnormal exit path.

use std::time::Duration;

use quick_xml::escape::escape;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{debug, warn};

const API_PORT: u16 = 12443;
const SESSION_HEADER: &str = "X-API-Session";
const LOGON_MEDIA_TYPE: &str = "application/vnd.ibm.powervm.web+xml; type=LogonRequest";
const UOM_MEDIA_TYPE: &str = "application/vnd.ibm.powervm.uom+xml";
const WEB_NS: &str = "http://www.ibm.com/xmlns/systems/power/firmware/web/mc/2012_10/";

// DELETE on the logon URL may answer with any of these.
const LOGOFF_OK: [u16; 3] = [200, 202, 204];

/// Errors from the session lifecycle.
///
/// `Auth` and `Protocol` are fatal for the whole run; `Transport` is only
/// fatal outside the failover loop (an unreachable host just means the
/// next one is tried).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The appliance rejected a logon or logoff. Nothing further can be
    /// done without fresh credentials.
    #[error("HMC {host} rejected {operation} (status {status})")]
    Auth {
        host: String,
        operation: &'static str,
        status: u16,
    },

    /// No response from the appliance at all.
    #[error("transport failure talking to {host}: {source}")]
    Transport {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    /// A 200 logon response that did not carry a session token.
    #[error("no session token in logon response from {host}")]
    MalformedLogon { host: String },

    /// Misuse of the session contract. Indicates a caller bug.
    #[error("session misuse: {0}")]
    Protocol(&'static str),
}

/// Credential pair for the management hosts. Assumed valid on all of them.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

/// Construction-time knobs for a session's HTTP client.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Verify the appliance's TLS certificate. HMCs frequently run
    /// without a CA-signed certificate, so insecure mode is available.
    pub verify_tls: bool,
    /// Timeout applied to every request on the session.
    pub timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An authenticated connection to one management host.
pub struct Session {
    host: String,
    token: String,
    connected: bool,
    client: Client,
}

impl Session {
    /// Performs the logon handshake against `host`.
    ///
    /// A non-200 status is [`SessionError::Auth`]. On success the session
    /// token is extracted from the response document; a 200 response
    /// without one is [`SessionError::MalformedLogon`].
    pub fn open(
        settings: &SessionSettings,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Self, SessionError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!settings.verify_tls)
            .timeout(settings.timeout)
            .build()
            .map_err(|source| SessionError::Transport {
                host: host.to_string(),
                source,
            })?;

        debug!(host, user = %credentials.user, "logging on");
        let response = client
            .put(logon_url(host))
            .header(CONTENT_TYPE, LOGON_MEDIA_TYPE)
            .body(logon_payload(&credentials.user, &credentials.password))
            .send()
            .map_err(|source| SessionError::Transport {
                host: host.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SessionError::Auth {
                host: host.to_string(),
                operation: "logon",
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| SessionError::Transport {
            host: host.to_string(),
            source,
        })?;
        let token = extract_token(&body).ok_or_else(|| SessionError::MalformedLogon {
            host: host.to_string(),
        })?;
        debug!(host, "logon accepted");

        Ok(Self {
            host: host.to_string(),
            token,
            connected: true,
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Issues an authenticated GET against a uom endpoint of this host.
    pub(crate) fn get_uom(&self, url: &str) -> Result<Response, SessionError> {
        if !self.connected {
            return Err(SessionError::Protocol("request on a closed session"));
        }
        self.client
            .get(url)
            .header(CONTENT_TYPE, "application/xml")
            .header(ACCEPT, UOM_MEDIA_TYPE)
            .header("Type", "LogicalPartition")
            .header(SESSION_HEADER, self.token.as_str())
            .send()
            .map_err(|source| SessionError::Transport {
                host: self.host.clone(),
                source,
            })
    }

    /// Revokes the session token (a DELETE on the logon URL).
    ///
    /// Idempotent: a no-op when already closed. The connected flag is
    /// cleared before the wire attempt so that logoff is tried exactly
    /// once however the attempt ends.
    pub fn close(&mut self) -> Result<(), SessionError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;

        debug!(host = %self.host, "logging off");
        let response = self
            .client
            .delete(logon_url(&self.host))
            .header(SESSION_HEADER, self.token.as_str())
            .send()
            .map_err(|source| SessionError::Transport {
                host: self.host.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        if LOGOFF_OK.contains(&status) {
            debug!(host = %self.host, status, "logged off");
            Ok(())
        } else {
            Err(SessionError::Auth {
                host: self.host.clone(),
                operation: "logoff",
                status,
            })
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.connected {
            if let Err(error) = self.close() {
                warn!(host = %self.host, %error, "logoff on drop failed");
            }
        }
    }
}

pub(crate) fn api_base(host: &str) -> String {
    format!("https://{host}:{API_PORT}")
}

fn logon_url(host: &str) -> String {
    format!("{}/rest/api/web/Logon", api_base(host))
}

fn logon_payload(user: &str, password: &str) -> String {
    format!(
        r#"<LogonRequest schemaVersion="V1_0" xmlns="{WEB_NS}" xmlns:mc="{WEB_NS}"><UserID>{}</UserID><Password>{}</Password></LogonRequest>"#,
        escape(user),
        escape(password),
    )
}

fn extract_token(body: &str) -> Option<String> {
    let document = roxmltree::Document::parse(body).ok()?;
    document
        .descendants()
        .find(|node| node.has_tag_name((WEB_NS, "X-API-Session")))
        .and_then(|node| node.text())
        .map(str::to_owned)
}
