use crate::{backend::TurnBackend, events::Stream, Error, Result};
use farkle_types::{ErrorBody, RecordRequest, RollRequest, TurnAction, TurnStateResponse, TurnUpdate};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Timeout for connections and requests
const TIMEOUT: Duration = Duration::from_secs(30);

/// Farkle backend API client.
///
/// One-shot request/response only: there is no automatic retry here. A
/// failed call leaves the turn state machine untouched and is safe to
/// retry manually.
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    pub ws_url: Url,
    pub http_client: HttpClient,
}

impl Client {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        // Convert http(s) to ws(s) for WebSocket URL
        let ws_scheme = match base_url.scheme() {
            "http" => "ws",
            "https" => "wss",
            scheme => {
                return Err(Error::InvalidScheme(scheme.to_string()));
            }
        };

        let mut ws_url = base_url.clone();
        ws_url
            .set_scheme(ws_scheme)
            .map_err(|_| Error::InvalidScheme(ws_scheme.to_string()))?;

        let http_client = HttpClient::builder()
            .timeout(TIMEOUT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            ws_url,
            http_client,
        })
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = self.base_url.join(path)?;
        debug!("Posting to {}", url);
        let response = self.http_client.post(url).json(request).send().await?;
        Self::parse_response(response).await
    }

    async fn parse_response<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        // Rejections carry a structured body; anything else is a bare status.
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(Error::Rejected {
                status,
                code: body.code,
                message: body.message,
            }),
            Err(_) => Err(Error::Failed(status)),
        }
    }

    /// Fetch the active turn for a game (connect/reconnect resync).
    pub async fn turn_state(&self, game_id: Uuid) -> Result<TurnStateResponse> {
        let url = self.base_url.join(&format!("turn/{game_id}"))?;
        let response = self.http_client.get(url).send().await?;
        Self::parse_response(response).await
    }

    /// Connect to the realtime updates stream for a game.
    pub async fn connect_updates(&self, game_id: Uuid) -> Result<Stream<TurnUpdate>> {
        let ws_url = self.ws_url.join(&format!("updates/{game_id}"))?;
        info!(ws_url = %ws_url, %game_id, "Connecting to updates WebSocket");

        let (ws_stream, _) = timeout(TIMEOUT, connect_async(ws_url.as_str()))
            .await
            .map_err(|_| Error::DialTimeout)??;
        info!("WebSocket connected");

        Ok(Stream::new(ws_stream))
    }
}

impl TurnBackend for Client {
    async fn roll(&self, request: RollRequest) -> Result<TurnAction> {
        self.post_json("roll", &request).await
    }

    async fn record(&self, request: RecordRequest) -> Result<TurnAction> {
        self.post_json("record", &request).await
    }
}
