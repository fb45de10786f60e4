//! Server-Sent Events (SSE) utilities
//!
//! Streams one notification channel to an HTTP client.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::events::{ApplicationEvent, ChannelKey, NotificationHub};

/// Convert an application event to an SSE frame
///
/// The SSE `event:` field carries the event type, `data:` the JSON body.
pub fn to_sse_event(event: &ApplicationEvent) -> Option<Event> {
    match Event::default().event(event.event_type()).json_data(event) {
        Ok(sse_event) => Some(sse_event),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Create an SSE response streaming every future event on `key`
///
/// The first frame is a `ConnectionStatus` event so clients can show a live
/// indicator before any application activity happens. Dropping the response
/// stream unsubscribes.
pub fn channel_sse_stream(
    hub: &NotificationHub,
    key: ChannelKey,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = hub.subscribe(key);
    info!(
        channel = %key,
        subscribers = hub.subscriber_count(key),
        "New SSE client connected"
    );

    let connected = futures::stream::once(async move {
        Ok(Event::default()
            .event("ConnectionStatus")
            .data(format!("connected:{}", key)))
    });

    let events = subscription.into_stream().filter_map(move |result| async move {
        match result {
            Ok(event) => {
                debug!(channel = %key, event = event.event_type(), "Sending SSE event");
                to_sse_event(&event).map(Ok)
            }
            Err(e) => {
                // Lagged subscriber: skip ahead, the store remains the source of truth
                warn!(channel = %key, "SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(connected.chain(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
