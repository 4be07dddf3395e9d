use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_broadcast::RecvError;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;

use crate::api::routes::game::{error_response, ErrorResponse};
use crate::application::game::{MatchError, MatchView};
use crate::api::AppState;

/// GET /api/matches/:matchId/events - Stream of committed changes.
/// Events carry the public view only; players fetch their hand separately.
pub async fn match_events_handler(
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<String>,
) -> Result<
    Sse<impl Stream<Item = Result<Event, Infallible>>>,
    (axum::http::StatusCode, axum::Json<ErrorResponse>),
> {
    let mut receiver = state
        .match_repo
        .subscribe(&match_id)
        .await
        .map_err(|e| error_response(MatchError::from(e)))?;

    let (current, version) = state
        .match_repo
        .read_state(&match_id)
        .await
        .map_err(|e| error_response(MatchError::from(e)))?;

    let stream = async_stream::stream! {
        tracing::debug!("SSE stream started for match {}", match_id);

        // Send initial connected event
        let initial = MatchView::from_state(&match_id, &current, None);
        yield Ok(Event::default()
            .event("connected")
            .data(serde_json::to_string(&initial).unwrap_or_default()));

        let mut last_seen = version;
        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(20));

        loop {
            tokio::select! {
                _ = heartbeat_interval.tick() => {
                    tracing::trace!("SSE heartbeat");
                    // Send heartbeat comment (not a real event)
                    yield Ok(Event::default().comment("heartbeat"));
                }
                result = receiver.recv() => {
                    match result {
                        Ok(change) => {
                            if change.version <= last_seen {
                                continue;
                            }
                            last_seen = change.version;

                            let view = MatchView::from_state(&match_id, &change.state, None);
                            let json = serde_json::to_string(&view).unwrap_or_default();
                            yield Ok(Event::default()
                                .event("stateChanged")
                                .id(change.version.to_string())
                                .data(json));

                            if change.state.is_finished() {
                                break;
                            }
                        }
                        Err(RecvError::Overflowed(missed)) => {
                            tracing::debug!("SSE client for match {} skipped {} changes", match_id, missed);
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("SSE feed for match {} ended", match_id);
                            break;
                        }
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
