use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use crate::error::TrackerError;
use crate::stomp::{is_heartbeat, Command, Frame};

/// An open transport, already split into frame channels.
///
/// Dropping `outbound` closes the transport; `inbound` yields `None` once the
/// peer is gone.
pub struct FrameLink {
    pub outbound: mpsc::UnboundedSender<Frame>,
    pub inbound: mpsc::UnboundedReceiver<Frame>,
}

/// Opens transports to the message bus.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<FrameLink, TrackerError>;
}

/// Web socket transport carrying STOMP text frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<FrameLink, TrackerError> {
        let (ws, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut source) = ws.split();
        let (outbound, mut out_rx) = mpsc::unbounded_channel::<Frame>();
        let (in_tx, inbound) = mpsc::unbounded_channel::<Frame>();

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let last = frame.command == Command::Disconnect;
                if let Err(e) = sink.send(Message::text(frame.encode())).await {
                    warn!("Tracker transport write failed: {}", e);
                    break;
                }
                if last {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if is_heartbeat(text.as_str()) {
                            continue;
                        }
                        match Frame::decode(text.as_str()) {
                            Ok(frame) => {
                                if in_tx.send(frame).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Dropping undecodable frame: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Tracker transport read failed: {}", e);
                        break;
                    }
                }
            }
            debug!("Tracker transport reader finished");
        });

        Ok(FrameLink { outbound, inbound })
    }
}
