//! Live notification subscription over SSE

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use hire_common::sse::channel_sse_stream;
use hire_common::ChannelKey;
use std::convert::Infallible;

use crate::error::IntakeError;
use crate::AppState;

/// GET /api/events/:channel
///
/// `channel` is `global`, `recruiter:{id}` or `applicant:{id}`. The stream
/// ends when the client disconnects, which drops the subscription.
///
/// No per-channel check happens here: the upstream auth collaborator decides
/// which callers may reach this route and which channels they may name.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, IntakeError> {
    let key: ChannelKey = channel
        .parse()
        .map_err(|_| IntakeError::BadRequest(format!("Unknown channel: {}", channel)))?;

    Ok(channel_sse_stream(&state.hub, key))
}
