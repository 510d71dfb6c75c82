use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};

use officeflow_core::config::BackendConfig;
use officeflow_core::error::{OfficeflowError, Result};
use officeflow_core::traits::PushConnector;
use officeflow_core::types::ProjectId;

/// Opens `/ws/projects/{id}` on the backend's push endpoint.
pub struct WsConnector {
    push_url: String,
}

impl WsConnector {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            push_url: config.push_url(),
        }
    }

    pub fn endpoint(&self, project: ProjectId) -> String {
        format!("{}/ws/projects/{}", self.push_url, project)
    }
}

impl PushConnector for WsConnector {
    fn connect(
        &self,
        project: ProjectId,
    ) -> BoxFuture<'_, Result<BoxStream<'static, Result<String>>>> {
        let url = self.endpoint(project);
        Box::pin(async move {
            let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| OfficeflowError::ConnectionLost(format!("{url}: {e}")))?;
            info!(url = %url, "WebSocket connected");

            // Pings are answered by tungstenite while the stream is read.
            let frames = ws_stream
                .take_while(|msg| {
                    let open = !matches!(msg, Ok(WsMessage::Close(_)));
                    if !open {
                        debug!("WebSocket close frame");
                    }
                    future::ready(open)
                })
                .filter_map(|msg| {
                    future::ready(match msg {
                        Ok(WsMessage::Text(text)) => Some(Ok(text.to_string())),
                        Ok(_) => None,
                        Err(e) => Some(Err(OfficeflowError::ConnectionLost(e.to_string()))),
                    })
                })
                .boxed();
            Ok(frames)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_uses_derived_push_url() {
        let connector = WsConnector::new(&BackendConfig::default());
        assert_eq!(
            connector.endpoint(ProjectId(12)),
            "ws://127.0.0.1:8420/ws/projects/12"
        );
    }

    #[test]
    fn endpoint_honours_explicit_ws_url() {
        let config = BackendConfig {
            ws_url: Some("wss://push.example.com".into()),
            ..BackendConfig::default()
        };
        let connector = WsConnector::new(&config);
        assert_eq!(
            connector.endpoint(ProjectId(3)),
            "wss://push.example.com/ws/projects/3"
        );
    }

    #[tokio::test]
    async fn refused_handshake_is_connection_lost() {
        let config = BackendConfig {
            ws_url: Some("ws://127.0.0.1:9".into()),
            ..BackendConfig::default()
        };
        let err = match WsConnector::new(&config).connect(ProjectId(1)).await {
            Ok(_) => panic!("handshake should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, OfficeflowError::ConnectionLost(_)));
    }
}
