//! # Live Runtime Flows
//!
//! The full runtime against a local push server speaking the indexer's
//! WebSocket protocol.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

    use chainviz_runtime::{ChainVizRuntime, RuntimeConfig};
    use cv_01_transport::ConnectionState;
    use cv_03_aggregation_engine::ChainDataApi;

    const BLOCK: &str = r#"{"channel":"chain","type":"block.finalized","payload":{"number":"42","hash":"0xb42","timestamp":"1700000000000","miner":"0xminer","reward":"5","transactionCount":1,"transactions":["0xt1"]}}"#;
    const PENDING: &str = r#"{"channel":"transactions","type":"transaction.pending","payload":{"hash":"0xt9"}}"#;

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            let msg = ws.next().await.unwrap().unwrap();
            if let Message::Text(text) = msg {
                return text.as_str().to_owned();
            }
        }
    }

    /// Accept one session, collect two subscription requests, push `frames`
    /// and hold the session until the client closes it.
    fn spawn_server(listener: TcpListener, frames: Vec<&'static str>) -> JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();

            let requests = vec![next_text(&mut ws).await, next_text(&mut ws).await];
            for frame in frames {
                ws.send(Message::Text(frame.to_string().into())).await.unwrap();
            }

            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
            requests
        })
    }

    fn live_config(port: u16) -> RuntimeConfig {
        let mut config = RuntimeConfig {
            metrics_interval_secs: 0,
            ..Default::default()
        };
        config.transport.base_url = format!("http://127.0.0.1:{port}");
        config.transport.connection_timeout_ms = 2_000;
        config.transport.reconnect_base_delay_ms = 10;
        config.transport.reconnect_max_delay_ms = 50;
        config
    }

    async fn eventually<F: Fn() -> bool>(check: F) {
        timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_runtime_ingests_live_feed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = spawn_server(listener, vec![BLOCK, "garbage", PENDING]);

        let runtime = ChainVizRuntime::new(live_config(port)).unwrap();
        runtime.start().await.unwrap();
        assert_eq!(runtime.connection_state().await, ConnectionState::Connected);

        let engine = runtime.engine();
        let ui = runtime.ui_state();
        eventually(|| engine.block_by_hash("0xb42").is_some()).await;
        eventually(|| engine.pending_transactions().len() == 1).await;
        eventually(|| {
            let state = ui.snapshot();
            state.connected() && state.recent_blocks.len() == 1 && state.metrics.is_some()
        })
        .await;

        runtime.shutdown().await;
        assert_eq!(runtime.connection_state().await, ConnectionState::Disconnected);
        assert!(!engine.is_running());

        let requests = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert_eq!(
            requests,
            vec![
                r#"{"action":"subscribe","channel":"chain"}"#.to_string(),
                r#"{"action":"subscribe","channel":"transactions"}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_runtime_start_fails_without_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let runtime = ChainVizRuntime::new(live_config(port)).unwrap();
        assert!(runtime.start().await.is_err());
        assert_eq!(runtime.connection_state().await, ConnectionState::Failed);
        runtime.shutdown().await;
    }
}
