use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::ClientConfig;
use crate::logging::{log_request, log_response, log_transport_failure, RequestId};
use crate::model::{Ballot, BallotToken, CastVoteRequest};

use super::{ApiError, ApiErrorBody, BallotApi, CastVoteResponse};

/// Thin JSON client for the VoteSphere REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base: config.api_url().to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Send a request, logging both directions, and turn non-2xx statuses into
    /// [`ApiError::Rejected`].
    async fn send(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let id = RequestId::next();
        log_request(id, method.as_str(), path);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log_transport_failure(id, path, &e);
                return Err(e.into());
            }
        };

        let status = response.status();
        log_response(id, status.as_u16(), path);
        if status.is_success() {
            Ok(response)
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(ApiError::rejected(status.as_u16(), ApiErrorBody::parse(&text)))
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// `GET` a JSON document. Query values are never logged.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.client.get(self.endpoint(path)).query(query);
        let response = self.send(Method::GET, path, request).await?;
        Self::decode(response).await
    }

    /// `POST` a JSON body and decode the JSON reply.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.post(path, body).await?;
        Self::decode(response).await
    }

    /// `POST` a JSON body, returning the raw successful response.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        let request = self.client.post(self.endpoint(path)).json(body);
        self.send(Method::POST, path, request).await
    }
}

/// [`BallotApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBallotApi {
    client: ApiClient,
}

impl HttpBallotApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(config)?,
        })
    }
}

#[async_trait]
impl BallotApi for HttpBallotApi {
    async fn fetch_ballot(&self, token: &BallotToken) -> Result<Ballot, ApiError> {
        self.client
            .get_json("/vote/ballot", &[("token", token.expose())])
            .await
    }

    async fn cast_vote(&self, request: &CastVoteRequest) -> Result<CastVoteResponse, ApiError> {
        let response = self.client.post("/vote", request).await?;
        // Anything 2xx means the ballot was accepted; the body is a courtesy.
        let bytes = response.bytes().await.unwrap_or_default();
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }
}
