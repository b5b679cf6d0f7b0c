use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::{Stream, StreamExt};

use crate::domain::session::Session;
use crate::usecase::feed::{FeedEvent, FeedFilter};
use crate::AppState;

fn to_sse(event: FeedEvent) -> Result<Event, Infallible> {
    let data = serde_json::to_string(&event).unwrap_or_default();
    Ok(Event::default().event(event.name()).data(data))
}

#[tracing::instrument(skip(state))]
pub async fn catalog_feed(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(subscribers = state.feed.subscriber_count() + 1, "catalog SSE stream started");

    let stream = state.feed.subscribe(FeedFilter::Catalog).map(to_sse);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id))]
pub async fn inbox_feed(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("inbox SSE stream started");

    let stream = state
        .feed
        .subscribe(FeedFilter::Inbox(session.user_id))
        .map(to_sse);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
