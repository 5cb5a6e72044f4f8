use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use uuid::Uuid;

use crate::assistant::SharedAssistant;
use crate::data_source::DataSource;
use crate::documents::{DocumentKind, SelectedFile, UploadedDocument};
use crate::error::AssistantError;
use crate::notify::{BufferedSink, Notification};
use crate::responder::{Feature, SAMPLE_QUERIES};
use crate::session::{ChatSession, Message, NewMessage};

#[derive(Clone)]
pub struct AppState {
    pub assistant: SharedAssistant,
    pub notifications: Arc<BufferedSink>,
}

type ApiResult<T> = Result<Json<T>, StatusCode>;

fn status(err: AssistantError) -> StatusCode {
    err.status()
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: ChatSession,
    pub preview_excerpt: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionView>,
}

async fn list_sessions(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let a = state.assistant.read().await;
    let active = a.active_session().map(|s| s.id);
    let chars = a.settings().preview_chars;
    let sessions = a
        .list_sessions()
        .iter()
        .map(|s| SessionView {
            preview_excerpt: s.preview_excerpt(chars),
            active: Some(s.id) == active,
            session: s.clone(),
        })
        .collect();
    Json(ListSessionsResponse { sessions })
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<ChatSession>) {
    let session = state.assistant.write().await.create_session();
    (StatusCode::CREATED, Json(session))
}

async fn get_active_session(State(state): State<AppState>) -> ApiResult<ChatSession> {
    let a = state.assistant.read().await;
    a.active_session().cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct SelectSessionBody {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SelectSessionResponse {
    pub selected: bool,
    pub active: Option<Uuid>,
}

async fn select_session(
    State(state): State<AppState>,
    Json(body): Json<SelectSessionBody>,
) -> Json<SelectSessionResponse> {
    let mut a = state.assistant.write().await;
    let selected = a.select_session(body.id);
    Json(SelectSessionResponse {
        selected,
        active: a.active_session().map(|s| s.id),
    })
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    state.assistant.write().await.delete_session(id).map_err(status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub session_id: Option<Uuid>,
    pub messages: Vec<Message>,
}

async fn list_messages(State(state): State<AppState>) -> Json<MessagesResponse> {
    let a = state.assistant.read().await;
    Json(MessagesResponse {
        session_id: a.active_session().map(|s| s.id),
        messages: a.active_messages().to_vec(),
    })
}

async fn session_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MessagesResponse> {
    let a = state.assistant.read().await;
    if !a.list_sessions().iter().any(|s| s.id == id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(MessagesResponse {
        session_id: Some(id),
        messages: a.messages(id).to_vec(),
    }))
}

async fn append_message(
    State(state): State<AppState>,
    Json(body): Json<NewMessage>,
) -> ApiResult<Message> {
    let mut a = state.assistant.write().await;
    a.append_message(body).map(Json).ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub content: String,
    #[serde(default)]
    pub feature: Feature,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub question: Message,
    pub reply: Option<Message>,
}

async fn send_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> ApiResult<QueryResponse> {
    let (question, reply) = state
        .assistant
        .send_query(body.feature, &body.content)
        .await
        .map_err(status)?;
    Ok(Json(QueryResponse { question, reply }))
}

#[derive(Debug, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: UploadedDocument,
    pub kind: DocumentKind,
    pub display_size: String,
}

impl From<&UploadedDocument> for DocumentView {
    fn from(d: &UploadedDocument) -> Self {
        Self {
            kind: d.kind(),
            display_size: d.display_size(),
            document: d.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentView>,
    pub uploading: bool,
}

async fn list_documents(State(state): State<AppState>) -> Json<DocumentsResponse> {
    let a = state.assistant.read().await;
    Json(DocumentsResponse {
        documents: a.list_documents().iter().map(DocumentView::from).collect(),
        uploading: a.is_uploading(),
    })
}

#[derive(Debug, Deserialize)]
pub struct UploadBody {
    pub files: Vec<SelectedFile>,
}

async fn upload_documents(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> Result<(StatusCode, Json<DocumentsResponse>), StatusCode> {
    let added = state.assistant.upload_documents(body.files).await.map_err(status)?;
    let documents = added.iter().map(DocumentView::from).collect();
    Ok((
        StatusCode::CREATED,
        Json(DocumentsResponse {
            documents,
            uploading: false,
        }),
    ))
}

async fn remove_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, StatusCode> {
    state.assistant.write().await.remove_document(id).map_err(status)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DataSourcesResponse {
    pub sources: &'static [DataSource],
    pub current: &'static DataSource,
}

async fn list_data_sources(State(state): State<AppState>) -> Json<DataSourcesResponse> {
    let a = state.assistant.read().await;
    Json(DataSourcesResponse {
        sources: a.data_sources(),
        current: a.current_data_source(),
    })
}

async fn get_current_data_source(State(state): State<AppState>) -> Json<&'static DataSource> {
    Json(state.assistant.read().await.current_data_source())
}

#[derive(Debug, Deserialize)]
pub struct SetDataSourceBody {
    pub id: String,
}

async fn set_current_data_source(
    State(state): State<AppState>,
    Json(body): Json<SetDataSourceBody>,
) -> ApiResult<&'static DataSource> {
    let source = state
        .assistant
        .write()
        .await
        .set_data_source(&body.id)
        .map_err(status)?;
    Ok(Json(source))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uploading: bool,
    pub reply_pending: bool,
    pub current_data_source: &'static DataSource,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let a = state.assistant.read().await;
    Json(StatusResponse {
        uploading: a.is_uploading(),
        reply_pending: a.is_reply_pending(),
        current_data_source: a.current_data_source(),
    })
}

async fn suggestions() -> Json<&'static [&'static str]> {
    Json(&SAMPLE_QUERIES[..])
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

async fn drain_notifications(State(state): State<AppState>) -> Json<NotificationsResponse> {
    Json(NotificationsResponse {
        notifications: state.notifications.drain(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/sessions", get(list_sessions).post(create_session))
        .route("/v1/sessions/active", get(get_active_session).put(select_session))
        .route("/v1/sessions/:id", delete(delete_session))
        .route("/v1/sessions/:id/messages", get(session_messages))
        .route("/v1/messages", get(list_messages).post(append_message))
        .route("/v1/query", post(send_query))
        .route("/v1/documents", get(list_documents).post(upload_documents))
        .route("/v1/documents/:id", delete(remove_document))
        .route("/v1/data-sources", get(list_data_sources))
        .route(
            "/v1/data-sources/current",
            get(get_current_data_source).put(set_current_data_source),
        )
        .route("/v1/status", get(get_status))
        .route("/v1/suggestions", get(suggestions))
        .route("/v1/notifications", get(drain_notifications))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
