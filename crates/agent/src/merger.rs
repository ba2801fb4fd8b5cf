//! Response stream merger.
//!
//! A turn writes to two channels: the resolver's (results of tool calls
//! carried over from earlier turns) and the driver's (new generation). The
//! client sees one stream: `start`, then everything from the resolver, then
//! everything from the driver, then exactly one `finish`.

use std::pin::Pin;

use futures::Stream;
use tokio::sync::mpsc;
use toolweave_core::stream::{FinishReason, UiStreamEvent};
use tracing::debug;

/// The outgoing event stream of one turn.
pub type TurnStream = Pin<Box<dyn Stream<Item = UiStreamEvent> + Send>>;

struct MergeState {
    start: Option<UiStreamEvent>,
    resolver: Option<mpsc::Receiver<UiStreamEvent>>,
    driver: mpsc::Receiver<UiStreamEvent>,
    finished: bool,
}

/// Merge the two halves of a turn into one stream.
///
/// The driver channel is not read until the resolver channel is closed.
/// A `finish` arriving from the resolver is dropped; the first one from the
/// driver ends the stream. If the driver closes without one, a `finish`
/// with reason `error` is synthesized.
pub fn merge(
    message_id: impl Into<String>,
    resolver: mpsc::Receiver<UiStreamEvent>,
    driver: mpsc::Receiver<UiStreamEvent>,
) -> TurnStream {
    let state = MergeState {
        start: Some(UiStreamEvent::Start {
            message_id: message_id.into(),
        }),
        resolver: Some(resolver),
        driver,
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut s| async move {
        if s.finished {
            return None;
        }
        if let Some(start) = s.start.take() {
            return Some((start, s));
        }
        while let Some(rx) = s.resolver.as_mut() {
            match rx.recv().await {
                Some(event) if event.is_finish() => continue,
                Some(event) => return Some((event, s)),
                None => s.resolver = None,
            }
        }
        let event = match s.driver.recv().await {
            Some(event) => event,
            None => {
                debug!("Driver closed without finish, synthesizing one");
                UiStreamEvent::finish(FinishReason::Error)
            }
        };
        if event.is_finish() {
            s.finished = true;
        }
        Some((event, s))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn resolver_events_precede_driver_events() {
        let (res_tx, res_rx) = mpsc::channel(8);
        let (drv_tx, drv_rx) = mpsc::channel(8);

        // The driver writes first; it must still come out second.
        drv_tx.send(UiStreamEvent::StartStep).await.unwrap();
        drv_tx.send(UiStreamEvent::finish(FinishReason::Stop)).await.unwrap();
        res_tx.send(UiStreamEvent::tool_output("old", json!("x"))).await.unwrap();
        drop(res_tx);

        let events: Vec<_> = merge("m1", res_rx, drv_rx).collect().await;
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], UiStreamEvent::Start { message_id: "m1".into() });
        assert_eq!(events[1].tool_call_id(), Some("old"));
        assert_eq!(events[2], UiStreamEvent::StartStep);
        assert!(events[3].is_finish());
    }

    #[tokio::test]
    async fn exactly_one_finish() {
        let (res_tx, res_rx) = mpsc::channel(8);
        let (drv_tx, drv_rx) = mpsc::channel(8);
        res_tx.send(UiStreamEvent::finish(FinishReason::Stop)).await.unwrap();
        drop(res_tx);
        drv_tx.send(UiStreamEvent::finish(FinishReason::Stop)).await.unwrap();
        drv_tx.send(UiStreamEvent::finish(FinishReason::Error)).await.unwrap();

        let events: Vec<_> = merge("m1", res_rx, drv_rx).collect().await;
        assert_eq!(events.iter().filter(|e| e.is_finish()).count(), 1);
        assert!(matches!(
            events.last(),
            Some(UiStreamEvent::Finish { finish_reason: FinishReason::Stop, .. })
        ));
    }

    #[tokio::test]
    async fn missing_finish_is_synthesized() {
        let (res_tx, res_rx) = mpsc::channel::<UiStreamEvent>(1);
        let (drv_tx, drv_rx) = mpsc::channel(1);
        drop(res_tx);
        drop(drv_tx);

        let events: Vec<_> = merge("m1", res_rx, drv_rx).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            UiStreamEvent::Finish { finish_reason: FinishReason::Error, .. }
        ));
    }
}
