//! `GET /reports/:id/stream`: Server-Sent Events.
//!
//! Each `snapshot` event carries a full [`ReportSnapshot`] as JSON. A failure
//! after the stream has started arrives as one final `error` event. Idle
//! recycle and client disconnect simply end the stream; clients reconnect.
//!
//! [`ReportSnapshot`]: mapbook_core::report::ReportSnapshot

use std::convert::Infallible;

use axum::{
  extract::{Path, State},
  response::sse::{Event, Sse},
};
use mapbook_core::store::ReportStore;
use tokio_stream::{Stream, StreamExt as _};

use crate::{
  ApiState,
  caller::Caller,
  error::ApiError,
  stream::{ReportSession, StreamItem},
};

pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  Caller(claims): Caller,
  Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: ReportStore + Clone + 'static,
{
  let (session, initial) =
    ReportSession::open(&state.service, claims, &id, state.stream_idle).await?;
  let events = session.spawn(initial).map(|item| Ok(to_event(item)));
  Ok(Sse::new(events))
}

fn to_event(item: StreamItem) -> Event {
  let (name, data) = match item {
    Ok(snapshot) => match serde_json::to_string(&snapshot) {
      Ok(json) => ("snapshot", json),
      Err(e) => {
        tracing::error!(error = %e, "failed to serialise snapshot");
        ("error", ApiError::Internal(Box::new(e)).body().to_string())
      }
    },
    Err(e) => ("error", e.body().to_string()),
  };
  Event::default().event(name).data(data)
}
