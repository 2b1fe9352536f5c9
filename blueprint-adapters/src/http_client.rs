use std::sync::Arc;
use std::time::Duration;

use hyper::body::to_bytes;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::traits::{GatewayError, GatewayResult, Provider};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

const ERROR_EXCERPT_CHARS: usize = 500;

pub(crate) fn build_https_client() -> HyperClient {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    Client::builder().build::<_, Body>(HttpsConnector::from((http, Arc::new(config))))
}

/// Validates a base URL and normalises it to end with `/`.
pub(crate) fn sanitize_base_url(provider: Provider, input: &str) -> GatewayResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(GatewayError::configuration(format!(
            "{provider} base URL must start with http:// or https://"
        )));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>().map_err(|err| {
        GatewayError::configuration(format!("invalid {provider} base URL: {err}"))
    })?;
    Ok(base)
}

/// Sends `request` within `limit` and decodes a successful JSON body into `T`.
///
/// `cancel` is checked before the request leaves; a request already in flight
/// runs to completion or timeout.
pub(crate) async fn send_json<T: DeserializeOwned>(
    client: &HyperClient,
    provider: Provider,
    request: Request<Body>,
    limit: Duration,
    cancel: &CancellationToken,
) -> GatewayResult<T> {
    if cancel.is_cancelled() {
        return Err(GatewayError::Cancelled);
    }

    let exchange = async {
        let response = client
            .request(request)
            .await
            .map_err(|err| GatewayError::transport(format!("{provider} request failed: {err}")))?;

        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.map_err(|err| {
            GatewayError::transport(format!("failed to read {provider} response: {err}"))
        })?;
        debug!(%provider, status = status.as_u16(), bytes = bytes.len(), "provider responded");

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let excerpt: String = body.chars().take(ERROR_EXCERPT_CHARS).collect();
            return Err(GatewayError::from_status(provider, status.as_u16(), excerpt));
        }

        serde_json::from_slice::<T>(&bytes).map_err(|err| {
            GatewayError::response(format!("failed to decode {provider} response: {err}"))
        })
    };

    timeout(limit, exchange)
        .await
        .unwrap_or(Err(GatewayError::TimedOut {
            provider,
            timeout: limit,
        }))
}
