use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use presence_protocol::{ClientEvent, ServerEvent};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::TransportError;
use crate::transport::{Frame, Link, Transport};

/// WebSocket transport. The credential travels as the `token` query parameter.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url)?,
        })
    }

    fn url_with_token(&self, credential: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("token", credential);
        url
    }
}

#[async_trait]
impl Transport for WsTransport {
    type Link = WsLink;

    async fn open(&self, credential: &str) -> Result<WsLink, TransportError> {
        let url = self.url_with_token(credential);
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(WsLink { stream })
    }
}

pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match ServerEvent::from_json(text.as_str()) {
                    Ok(event) => return Ok(Frame::Event(event)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring undecodable server frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty());
                    return Ok(Frame::Closed(reason));
                }
                // Pings are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Closed(e.to_string())),
                None => return Ok(Frame::Closed(None)),
            }
        }
    }

    async fn send(&mut self, event: &ClientEvent) -> Result<(), TransportError> {
        let json = event
            .to_json()
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Closed(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
