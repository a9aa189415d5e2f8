use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::AppState;

/// GET /events: notices as Server-Sent Events.
///
/// The subscription lives as long as the client connection; dropping the
/// stream unsubscribes.
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(notice) => {
                    if let Ok(json) = serde_json::to_string(&notice) {
                        yield Ok(Event::default().event(notice.kind.as_str()).data(json));
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("SSE client lagged by {} notices", n);
                    yield Ok(Event::default()
                        .event("lagged")
                        .data(format!("{{\"lagged\":{}}}", n)));
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_state;
    use crate::notify::{NoticeKind, NotificationSink};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures::StreamExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_event_stream_delivers_notices() {
        let state = test_state();
        let response = crate::api::router(state.clone())
            .oneshot(Request::get("/events").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(state.events.subscriber_count(), 1);

        state.events.notify(NoticeKind::Success, "Imported weather-mcp");

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: success"));
        assert!(text.contains("Imported weather-mcp"));

        drop(body);
        assert_eq!(state.events.subscriber_count(), 0);
    }
}
