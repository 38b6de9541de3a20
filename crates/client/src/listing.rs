//! Lazy traversal of cursor-paginated remote collections.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use mailcheck_domain::{ListSegment, ListingDirection, MailCheckError, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::invoker::{RequestSpec, RestInvoker};

struct PaginationState<T> {
    invoker: Arc<RestInvoker>,
    path: String,
    /// Filter fragments for the first request; `None` once consumed
    /// (cursor requests carry the cursor only, the server embeds the
    /// filter in it).
    filters: Option<Vec<(String, String)>>,
    direction: ListingDirection,
    limit: Option<u32>,
    cancellation: Option<CancellationToken>,
    buffer: VecDeque<T>,
    cursor: Option<String>,
    exhausted: bool,
}

/// Produce a lazy, finite stream over a cursor-paginated collection.
///
/// The first request carries the caller's filter fragments; follow-up
/// requests carry only the cursor, named `cursor` or `cursor:prev` by
/// direction. Segments are fetched strictly in sequence; the stream ends
/// after the items of the first non-truncated segment. Cancellation is
/// checked between items, never mid-item. Each call starts a fresh
/// server-side traversal: the stream is not restartable.
pub(crate) fn paginate<T>(
    invoker: Arc<RestInvoker>,
    path: impl Into<String>,
    filters: Vec<(String, String)>,
    direction: ListingDirection,
    limit: Option<u32>,
    cancellation: Option<&CancellationToken>,
) -> impl Stream<Item = Result<T>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let state = PaginationState {
        invoker,
        path: path.into(),
        filters: Some(filters),
        direction,
        limit,
        cancellation: cancellation.cloned(),
        buffer: VecDeque::new(),
        cursor: None,
        exhausted: false,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(token) = &state.cancellation {
                token.ensure_not_canceled()?;
            }

            if let Some(item) = state.buffer.pop_front() {
                return Ok(Some((item, state)));
            }
            if state.exhausted {
                return Ok(None);
            }

            let mut spec = RequestSpec::new(Method::GET, &state.path);
            match state.cursor.take() {
                Some(cursor) => {
                    spec = spec.query_pair(state.direction.cursor_param(), cursor);
                }
                None => {
                    for (key, value) in state.filters.take().unwrap_or_default() {
                        spec = spec.query_pair(key, value);
                    }
                }
            }
            if let Some(limit) = state.limit {
                spec = spec.query_pair("limit", limit.to_string());
            }

            let response = state.invoker.invoke(spec, state.cancellation.as_ref()).await?;
            if response.status() != StatusCode::OK {
                return Err(MailCheckError::UnexpectedResponse {
                    status: response.status().as_u16(),
                    message: format!("unexpected status while listing {}", state.path),
                });
            }

            let segment: ListSegment<T> = response.deserialize()?;
            debug!(
                path = %state.path,
                items = segment.data.len(),
                truncated = segment.meta.is_truncated,
                "fetched listing segment"
            );

            state.buffer = segment.data.into();
            if segment.meta.is_truncated {
                let cursor = segment.meta.cursor.ok_or_else(|| {
                    MailCheckError::Internal(
                        "truncated segment arrived without a pagination cursor".into(),
                    )
                })?;
                state.cursor = Some(cursor);
            } else {
                state.exhausted = true;
            }
        }
    })
}
