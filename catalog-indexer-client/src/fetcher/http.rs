use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, StatusCode};
use std::marker::PhantomData;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::fetcher::EntityFetcher;
use crate::resource::Resource;

/// Fetches entities with `GET {base_url}/{id}`.
pub struct HttpFetcher<E: Resource> {
    base_url: String,
    bearer_token: Option<String>,
    client: ReqwestClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Resource> HttpFetcher<E> {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = ReqwestClient::builder()
            .timeout(config.read_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::InvalidRequest {
                namespace: E::KIND.namespace(),
                message: e.to_string(),
            })?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            client,
            _entity: PhantomData,
        })
    }

    fn url_for(&self, id: &str) -> Result<String, ClientError> {
        if id.is_empty() || id.contains('/') || id.chars().any(char::is_whitespace) {
            return Err(ClientError::InvalidRequest {
                namespace: E::KIND.namespace(),
                message: format!("invalid resource id '{}'", id),
            });
        }
        Ok(format!("{}/{}", self.base_url, id))
    }
}

#[async_trait]
impl<E: Resource> EntityFetcher<E> for HttpFetcher<E> {
    #[instrument(skip(self), fields(namespace = E::KIND.namespace()))]
    async fn fetch(&self, id: &str) -> Result<Option<E>, ClientError> {
        let namespace = E::KIND.namespace();
        let url = self.url_for(id)?;

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(namespace, id, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Resource response received");

        if classify_status(namespace, id, status)? == StatusClass::NotFound {
            return Ok(None);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(namespace, id, e))?;

        let decoded: E::Response =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
                namespace,
                id: id.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(E::from_response(decoded)))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StatusClass {
    Found,
    NotFound,
}

fn classify_status(
    namespace: &'static str,
    id: &str,
    status: StatusCode,
) -> Result<StatusClass, ClientError> {
    let code = status.as_u16();
    match status {
        s if s.is_success() => Ok(StatusClass::Found),
        StatusCode::NOT_FOUND => Ok(StatusClass::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized {
            namespace,
            id: id.to_string(),
            status: code,
        }),
        s if s.is_server_error() => Err(ClientError::ServerError {
            namespace,
            id: id.to_string(),
            status: code,
        }),
        _ => Err(ClientError::UnexpectedStatus {
            namespace,
            id: id.to_string(),
            status: code,
        }),
    }
}

fn transport_error(namespace: &'static str, id: &str, err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            namespace,
            id: id.to_string(),
        }
    } else if err.is_builder() {
        ClientError::InvalidRequest {
            namespace,
            message: err.to_string(),
        }
    } else {
        ClientError::Unavailable {
            namespace,
            id: id.to_string(),
            message: err.to_string(),
        }
    }
}
