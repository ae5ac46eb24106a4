//! Blocking HTTP GET used by the `weather` builtin, on top of `reqwest`.

use crate::host::Host;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::borrow::Cow;
use std::io::{ErrorKind, Read};
use std::time::Duration;

pub use reqwest::Url;

/// Redirects followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Bytes read from the body between two host event pumps.
const READ_CHUNK: usize = 4096;

/// Status and body of a finished request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, empty when unknown.
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("could not set up the HTTP client")
}

/// GET `url`, following up to [`MAX_REDIRECTS`] redirects.
///
/// The body is read in bounded chunks with `host.pump_events()` in between.
/// Non-2xx statuses are returned, not turned into errors.
pub fn get(url: &Url, timeout: Duration, host: &mut dyn Host) -> Result<HttpResponse> {
    let mut response = client(timeout)?
        .get(url.clone())
        .send()
        .with_context(|| format!("could not reach {url}"))?;
    host.pump_events();

    let status = response.status();
    let mut body = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                body.extend_from_slice(&chunk[..n]);
                host.pump_events();
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("could not read the response from {url}"));
            }
        }
    }
    tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "http get finished");

    Ok(HttpResponse {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
        body,
    })
}
