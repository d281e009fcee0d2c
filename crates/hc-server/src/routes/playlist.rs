//! Media playlist route with LL-HLS blocking playlist reload.
//!
//! `GET /hls/stream.m3u8?_HLS_msn=M[&_HLS_part=P]` holds the request until
//! the playlist contains segment `M` (or part `P` of it), for at most three
//! target durations.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hc_core::Error;

use crate::context::AppContext;
use crate::error::AppError;
use crate::muxer::{Muxer, PlaylistSnapshot, MEDIA_PLAYLIST};

/// Requests may not block on segments further ahead of the live edge.
const MAX_MSN_LOOKAHEAD: u64 = 2;

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Default, Deserialize)]
pub struct BlockingReloadQuery {
    #[serde(rename = "_HLS_msn")]
    pub msn: Option<u64>,
    #[serde(rename = "_HLS_part")]
    pub part: Option<usize>,
}

/// GET /hls/stream.m3u8
pub async fn media_playlist(
    State(ctx): State<AppContext>,
    Query(query): Query<BlockingReloadQuery>,
) -> Result<Response, AppError> {
    let snapshot = match query.msn {
        Some(msn) => wait_for_playlist(&ctx.muxer, msn, query.part).await?,
        None if query.part.is_some() => {
            return Err(Error::Validation("_HLS_part requires _HLS_msn".into()).into());
        }
        None => ctx.muxer.snapshot(),
    };

    let body = snapshot
        .body
        .ok_or_else(|| Error::not_found("playlist", MEDIA_PLAYLIST))?;

    Ok((
        [
            (header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body.to_string(),
    )
        .into_response())
}

async fn wait_for_playlist(
    muxer: &Muxer,
    msn: u64,
    part: Option<usize>,
) -> hc_core::Result<PlaylistSnapshot> {
    let mut rx = muxer.subscribe();
    let (next_msn, target_duration, ended) = {
        let current = rx.borrow();
        (current.next_msn, current.target_duration, current.ended)
    };

    if !ended && msn > next_msn + MAX_MSN_LOOKAHEAD {
        return Err(Error::Validation(format!(
            "_HLS_msn={msn} is too far ahead of the live edge ({next_msn})"
        )));
    }

    let timeout = target_duration * 3;
    let waited = tokio::time::timeout(timeout, rx.wait_for(|s| s.satisfies(msn, part))).await;
    match waited {
        Ok(Ok(snapshot)) => Ok(snapshot.clone()),
        Ok(Err(_)) => Err(Error::Unavailable("muxer stopped".into())),
        Err(_) => {
            tracing::debug!(msn, ?part, ?timeout, "Blocking playlist reload timed out");
            Err(Error::Unavailable(format!(
                "segment {msn} was not produced within {timeout:?}"
            )))
        }
    }
}
