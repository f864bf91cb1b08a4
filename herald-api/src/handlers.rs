//! Request handlers for the mailing endpoints

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::QueryRejection},
    response::IntoResponse,
};
use herald_delivery::WakeSignal;
use herald_queue::{EntryId, MailingStatus, PersistenceError, QueueEntry, QueueStore};
use serde::{Deserialize, Serialize};

use crate::RequestError;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<dyn QueueStore>,
    pub waker: WakeSignal,
    pub page_size: usize,
}

/// Body of `POST /mailing`
///
/// Delivery state sent by the client (status, attempts, delivered flags) is
/// not part of this type and is dropped during deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewMailing {
    pub receivers: Vec<NewReceiver>,
    #[serde(default)]
    pub subject: String,
    #[serde(default, alias = "text")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewReceiver {
    #[serde(alias = "addr")]
    pub address: String,
}

impl From<NewMailing> for QueueEntry {
    fn from(mailing: NewMailing) -> Self {
        Self::new(
            mailing.receivers.into_iter().map(|r| r.address),
            mailing.subject,
            mailing.body,
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    p: Option<i64>,
}

/// One row of `GET /mailing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub status: MailingStatus,
}

/// Response of `GET /mailing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailingPage {
    /// Number of pages
    pub total: usize,
    pub data: Vec<EntrySummary>,
}

/// `POST /mailing`
pub(crate) async fn create_mailing(
    State(state): State<AppState>,
    body: Result<Json<NewMailing>, JsonRejection>,
) -> Result<impl IntoResponse, RequestError> {
    let Json(mailing) = body.map_err(|e| RequestError::BadRequest(e.body_text()))?;

    let saved = state.store.save(QueueEntry::from(mailing)).await?;
    let id = saved.id.ok_or_else(|| {
        RequestError::Queue(
            PersistenceError::Internal("Saved entry has no id".to_string()).into(),
        )
    })?;

    tracing::info!(entry_id = %id, receivers = saved.receivers.len(), "Mailing enqueued");
    state.waker.wake();

    Ok(id.to_string())
}

/// `GET /mailing?p=N`
pub(crate) async fn list_mailings(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<MailingPage>, RequestError> {
    let Query(query) = query.map_err(|e| RequestError::BadRequest(e.body_text()))?;

    let page = query.p.unwrap_or(1);
    let page = usize::try_from(page)
        .ok()
        .filter(|p| *p >= 1)
        .ok_or_else(|| RequestError::BadRequest(format!("Invalid page number: {page}")))?;

    let skip = (page - 1).saturating_mul(state.page_size);
    let entries = state.store.find_page(skip, state.page_size).await?;
    let count = state.store.count().await?;

    Ok(Json(MailingPage {
        total: 1 + count / state.page_size.max(1),
        data: entries
            .into_iter()
            .filter_map(|entry| {
                entry.id.map(|id| EntrySummary {
                    id,
                    status: entry.status,
                })
            })
            .collect(),
    }))
}

/// `GET /mailing/{id}`
pub(crate) async fn get_mailing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueueEntry>, RequestError> {
    let id: EntryId = id
        .parse()
        .map_err(|e| RequestError::BadRequest(format!("Invalid mailing id {id:?}: {e}")))?;

    Ok(Json(state.store.find(&id).await?))
}
