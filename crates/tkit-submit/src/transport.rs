//! Form POST transport with proxy fallback.

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::EndpointConfig;
use crate::error::{SubmitError, SubmitResult};

/// What came back from one POST.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// URL after redirects
    pub final_url: String,
    pub body: String,
}

/// POST `form` to the endpoint.
///
/// If the direct request cannot connect and a proxy is configured, the same
/// request is sent once through the proxy. This is a transport substitution,
/// not a retry: the direct request never reached the service.
pub async fn post_form(
    http: &Client,
    endpoint: &EndpointConfig,
    form: &[(&str, &str)],
) -> SubmitResult<RawResponse> {
    match send(http, &endpoint.url, form).await {
        Ok(response) => Ok(response),
        Err(e) if e.is_connect() => match endpoint.proxied_url() {
            Some(proxied) => {
                warn!(url = %endpoint.url, "Direct request failed to connect, using proxy: {}", e);
                send(http, &proxied, form).await.map_err(SubmitError::from)
            }
            None => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

async fn send(http: &Client, url: &str, form: &[(&str, &str)]) -> Result<RawResponse, reqwest::Error> {
    debug!(url, "Sending form submission");

    let response = http.post(url).form(form).send().await?;
    let status = response.status();
    let final_url = response.url().to_string();
    let body = response.text().await?;

    debug!(url, status = status.as_u16(), bytes = body.len(), "Received response");

    Ok(RawResponse {
        status,
        final_url,
        body,
    })
}
