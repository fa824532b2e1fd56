use std::{convert::Infallible, time::Duration};

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::clock::{CountdownQuery, TimerTick},
    error::AppError,
    services::clock_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/games/countdown",
    tag = "sse",
    params(CountdownQuery),
    responses(
        (status = 200, description = "One `countdown` event per value, down to zero", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid countdown parameters")
    )
)]
/// Stream a pre-game countdown.
pub async fn countdown(
    Query(query): Query<CountdownQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    query.validate()?;
    info!(from = query.from, every_ms = query.every_ms, "new countdown stream");

    let events = clock_service::countdown(query.from, Duration::from_millis(query.every_ms))
        .map(|remaining| Ok(Event::default().event("countdown").data(remaining.to_string())));
    Ok(with_keep_alive(events))
}

#[utoipa::path(
    get,
    path = "/games/timer",
    tag = "sse",
    responses((status = 200, description = "One `tick` event per second", content_type = "text/event-stream", body = TimerTick))
)]
/// Stream the elapsed time of the game underway.
pub async fn timer() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("new game timer stream");
    let events = clock_service::game_timer().filter_map(|seconds| async move {
        let tick = TimerTick {
            seconds,
            label: clock_service::format_elapsed(Duration::from_secs(seconds)),
        };
        json_event("tick", &tick)
    });
    with_keep_alive(events)
}

#[utoipa::path(
    get,
    path = "/games/setup/events",
    tag = "sse",
    responses((status = 200, description = "Current setup status, then every change", content_type = "text/event-stream", body = crate::state::SetupStatus))
)]
/// Follow the progress of the running game setup.
pub async fn setup_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("new setup status stream");
    let events = WatchStream::new(state.setup_watcher())
        .filter_map(|status| async move { json_event("setup", &status) });
    with_keep_alive(events)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/games/countdown", get(countdown))
        .route("/games/timer", get(timer))
        .route("/games/setup/events", get(setup_events))
}

fn json_event<T: Serialize>(name: &'static str, payload: &T) -> Option<Result<Event, Infallible>> {
    match serde_json::to_string(payload) {
        Ok(data) => Some(Ok(Event::default().event(name).data(data))),
        Err(err) => {
            warn!(event = name, error = %err, "failed to serialise SSE payload");
            None
        }
    }
}

fn with_keep_alive<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
