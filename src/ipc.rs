//! The message bridge between Surfaces and the Controller.
//!
//! Nothing crosses it but serialized protocol messages: a Surface never holds
//! a reference into Controller state, and vice versa.

use std::fmt;

use futures::channel::mpsc;
use serde::Serialize;

use crate::protocol::{self, ControllerMessage, ProtocolError, SurfaceMessage};

/// Identity of one attached panel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SurfaceId(pub(crate) u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}

/// One serialized Surface message plus its sender.
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) from: SurfaceId,
    pub(crate) payload: String,
}

pub(crate) type Inbox = mpsc::UnboundedReceiver<Envelope>;

pub(crate) fn inbox() -> (mpsc::UnboundedSender<Envelope>, Inbox) {
    mpsc::unbounded()
}

/// A Surface's end of the bridge.
pub(crate) struct SurfaceLink {
    pub(crate) id: SurfaceId,
    outbound: mpsc::UnboundedSender<Envelope>,
    pub(crate) inbound: mpsc::UnboundedReceiver<String>,
}

impl SurfaceLink {
    pub(crate) fn new(
        id: SurfaceId,
        outbound: mpsc::UnboundedSender<Envelope>,
        inbound: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        Self { id, outbound, inbound }
    }

    /// Fire-and-forget. Returns false once the Controller is gone.
    pub(crate) fn post(&self, message: &SurfaceMessage) -> bool {
        let payload = match protocol::encode(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(surface = %self.id, kind = message.kind(), "encode failed: {e}");
                return true;
            }
        };
        self.outbound
            .unbounded_send(Envelope {
                from: self.id,
                payload,
            })
            .is_ok()
    }

    /// Parse one line pushed by the Controller.
    pub(crate) fn decode(line: &str) -> Result<ControllerMessage, ProtocolError> {
        protocol::decode(line)
    }
}

/// Encode and push `message` down a Surface's inbound channel.
pub(crate) fn push<T: Serialize>(
    tx: &mpsc::UnboundedSender<String>,
    message: &T,
) -> Result<bool, ProtocolError> {
    let line = protocol::encode(message)?;
    Ok(tx.unbounded_send(line).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn post_serializes_with_sender_id() {
        let (tx, mut rx) = inbox();
        let (_push_tx, push_rx) = mpsc::unbounded();
        let link = SurfaceLink::new(SurfaceId(7), tx, push_rx);

        assert!(link.post(&SurfaceMessage::LoadData));
        let envelope = rx.next().await.unwrap();
        assert_eq!(envelope.from, SurfaceId(7));
        assert_eq!(envelope.payload, r#"{"type":"loadData"}"#);
    }

    #[tokio::test]
    async fn post_reports_closed_controller() {
        let (tx, rx) = inbox();
        drop(rx);
        let (_push_tx, push_rx) = mpsc::unbounded();
        let link = SurfaceLink::new(SurfaceId(1), tx, push_rx);
        assert!(!link.post(&SurfaceMessage::SendEnterOnly));
    }

    #[tokio::test]
    async fn push_round_trips_through_decode() {
        let (tx, mut rx) = mpsc::unbounded();
        assert!(push(&tx, &ControllerMessage::FocusInput).unwrap());
        let line = rx.next().await.unwrap();
        assert_eq!(SurfaceLink::decode(&line).unwrap(), ControllerMessage::FocusInput);
    }

    #[test]
    fn surface_id_display() {
        assert_eq!(SurfaceId(3).to_string(), "panel-3");
    }
}
