//! NTLM-signed HTTP transport.
//!
//! NTLM authenticates a TCP connection, not a request, so both legs of a
//! handshake must travel on the same socket. Each handshake checks out a
//! lane: a client whose pool holds at most one HTTP/1 connection. Concurrent
//! requests use separate lanes; finished lanes are kept for reuse.
//!
//! Servers that answer the negotiate leg without a challenge (anonymous
//! access, test doubles) get that first response returned as is.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{PsError, PsResult};
use crate::ntlm::{self, NtlmCredentials};

const ODATA_VERBOSE: &str = "application/json;odata=verbose";

/// Idle lanes kept between requests.
const MAX_IDLE_LANES: usize = 8;

/// Final status and decoded body of a Project Server call.
#[derive(Debug, Clone)]
pub struct PsResponse {
    pub status: u16,
    /// Parsed JSON, the raw text when the body isn't JSON, or `Null` when empty.
    pub body: Value,
}

impl PsResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub struct NtlmTransport {
    credentials: NtlmCredentials,
    timeout: Duration,
    idle_lanes: Mutex<Vec<reqwest::Client>>,
}

impl NtlmTransport {
    pub fn new(credentials: NtlmCredentials, timeout: Duration) -> PsResult<Self> {
        // Surfaces client build errors at construction.
        let lane = build_lane(timeout)?;
        Ok(Self {
            credentials,
            timeout,
            idle_lanes: Mutex::new(vec![lane]),
        })
    }

    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: HeaderMap,
    ) -> PsResult<PsResponse> {
        let lane = self.checkout_lane().await?;
        let result = self.handshake(&lane, method, url, body, headers).await;
        // A lane that failed mid-handshake may hold a half-authenticated socket.
        if result.is_ok() {
            self.release_lane(lane).await;
        }
        result
    }

    async fn checkout_lane(&self) -> PsResult<reqwest::Client> {
        if let Some(lane) = self.idle_lanes.lock().await.pop() {
            return Ok(lane);
        }
        build_lane(self.timeout)
    }

    async fn release_lane(&self, lane: reqwest::Client) {
        let mut idle = self.idle_lanes.lock().await;
        if idle.len() < MAX_IDLE_LANES {
            idle.push(lane);
        }
    }

    async fn handshake(
        &self,
        lane: &reqwest::Client,
        method: Method,
        url: &str,
        body: Option<&str>,
        headers: HeaderMap,
    ) -> PsResult<PsResponse> {
        let negotiate = request(lane, method.clone(), url, body, headers.clone())
            .header(AUTHORIZATION, format!("NTLM {}", ntlm::negotiate_message()))
            .send()
            .await?;

        if negotiate.status() != StatusCode::UNAUTHORIZED {
            return read_response(negotiate).await;
        }

        let challenge = negotiate
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(ntlm::challenge_from_header)
            .map(str::to_owned);
        let Some(challenge) = challenge else {
            tracing::debug!(url, "401 without NTLM challenge");
            return read_response(negotiate).await;
        };
        // Drain so the lane's connection is idle again for the second leg.
        let _ = negotiate.bytes().await;

        let challenge = ntlm::parse_challenge(&challenge)?;
        let client_challenge: [u8; 8] = rand::random();
        let token = ntlm::authenticate_message(
            &self.credentials,
            &challenge,
            client_challenge,
            ntlm::filetime_now(),
        )?;

        let response = request(lane, method, url, body, headers)
            .header(AUTHORIZATION, format!("NTLM {token}"))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(PsError::Authentication(format!(
                "credentials for {}\\{} were rejected",
                self.credentials.domain, self.credentials.username
            )));
        }
        read_response(response).await
    }

}

fn build_lane(timeout: Duration) -> PsResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .http1_only()
        .pool_max_idle_per_host(1)
        .build()?)
}

fn request(
    lane: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<&str>,
    headers: HeaderMap,
) -> reqwest::RequestBuilder {
    let mut builder = lane
        .request(method, url)
        .header(ACCEPT, ODATA_VERBOSE)
        .header(CONTENT_TYPE, ODATA_VERBOSE)
        .headers(headers);
    if let Some(body) = body {
        builder = builder.body(body.to_owned());
    }
    builder
}

async fn read_response(response: reqwest::Response) -> PsResult<PsResponse> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(PsResponse { status, body })
}
