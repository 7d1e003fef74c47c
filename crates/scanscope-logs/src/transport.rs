use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use thiserror::Error;

/// Raw body chunks of one open subscription
pub type EventByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Why a subscription could not be opened or was lost
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("stream closed by server")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Something that can open a log event subscription
pub trait Transport: Send + Sync + 'static {
    fn open(&self) -> impl Future<Output = Result<EventByteStream, TransportError>> + Send;
}

/// Subscribes to the relay's stream endpoint over HTTP
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Transport for HttpTransport {
    async fn open(&self) -> Result<EventByteStream, TransportError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed())
    }
}
