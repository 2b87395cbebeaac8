//! Shared request sending and response reading

use crate::config::HttpStrategyConfig;
use crate::error::HttpError;
use futures::StreamExt;
use karman_core::error::TransportError;
use karman_core::request::{Method, RequestDetail};
use reqwest::{Client, Response};
use std::collections::BTreeMap;

/// A received response, fully read
pub(crate) struct Received {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

pub(crate) struct HttpTransport {
    client: Client,
    config: HttpStrategyConfig,
}

impl HttpTransport {
    pub fn new(config: HttpStrategyConfig) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &HttpStrategyConfig {
        &self.config
    }

    /// Send the request; statuses of 400 and above become [`TransportError::Status`]
    pub async fn execute(&self, request: &RequestDetail) -> Result<Received, TransportError> {
        let mut builder = self
            .client
            .request(method(request.method), &request.url)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            request_id = %request.request_id,
            "Sending HTTP request"
        );

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or("<invalid>").to_string(),
                )
            })
            .collect();
        let body = self.read_body(response).await?;

        tracing::debug!(status, bytes = body.len(), "HTTP response received");

        if status >= 400 {
            return Err(TransportError::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(Received { status, headers, body })
    }

    /// Stream response with size limit
    async fn read_body(&self, response: Response) -> Result<Vec<u8>, TransportError> {
        let max = self.config.max_response_bytes();
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_error(&e))?;

            if body.len() + chunk.len() > max {
                return Err(TransportError::Protocol(format!("Response too large (>{max} bytes)")));
            }

            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                after: self.config.timeout(),
            }
        } else if error.is_connect() || error.is_request() {
            TransportError::Network(error.to_string())
        } else {
            TransportError::Protocol(error.to_string())
        }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}
