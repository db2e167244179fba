use axum::{
    http::{header, HeaderName},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::StreamExt;
use relay_stream::SessionStream;
use relay_types::StreamEvent;
use std::convert::Infallible;

static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// `event: <type>` with the JSON payload as `data`
pub fn to_sse_event(event: &StreamEvent) -> Event {
    match Event::default().event(event.event_name()).json_data(event) {
        Ok(sse_event) => sse_event,
        Err(e) => {
            tracing::error!("Failed to serialize {} event: {}", event.event_name(), e);
            Event::default()
                .event("error")
                .data(r#"{"type":"error","error":"event serialization failed"}"#)
        }
    }
}

/// Stream a session to the client with proxy buffering and caching disabled
///
/// The response body owns the session stream, so a client disconnect cancels the session.
/// Idle streams get a comment frame every 15s to keep intermediaries from timing out.
pub fn sse_response(session: SessionStream) -> impl IntoResponse {
    let events = session.map(|event| Ok::<Event, Infallible>(to_sse_event(&event)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING.clone(), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
}
