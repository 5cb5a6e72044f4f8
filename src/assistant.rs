use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::data_source::{DataSource, DataSourceSelector};
use crate::documents::{DocumentStore, PendingUpload, SelectedFile, UploadedDocument};
use crate::error::AssistantError;
use crate::latency::{Delay, Latency};
use crate::notify::{Notification, NotificationSink};
use crate::responder::{Feature, Reply, ReplyRequest, generate_reply};
use crate::session::{ChatSession, Message, NewMessage, SessionStore};
use crate::settings::EffectiveSettings;

/// A query whose user message is stored and whose answer is decided, waiting
/// out the simulated latency.
#[derive(Debug)]
pub struct PendingQuery {
    pub session_id: Uuid,
    pub user_message: Message,
    reply: Reply,
}

impl PendingQuery {
    pub fn delay(&self) -> Delay {
        if self.reply.needs_documents {
            Delay::Notice
        } else {
            Delay::Reply
        }
    }
}

/// Client-side state of the assistant: sessions, the shared document library,
/// the selected data source and the single pending-reply slot.
pub struct Assistant {
    sessions: SessionStore,
    documents: DocumentStore,
    sources: DataSourceSelector,
    reply_pending: bool,
    rng: StdRng,
    sink: Arc<dyn NotificationSink>,
    settings: EffectiveSettings,
}

impl Assistant {
    pub fn new(settings: EffectiveSettings, sink: Arc<dyn NotificationSink>) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self::with_rng(settings, sink, rng)
    }

    /// Starts with one fresh session so the UI always has something active.
    pub fn with_rng(
        settings: EffectiveSettings,
        sink: Arc<dyn NotificationSink>,
        rng: StdRng,
    ) -> Self {
        let mut sessions = SessionStore::new();
        sessions.create_session();
        Self {
            sessions,
            documents: DocumentStore::new(),
            sources: DataSourceSelector::default(),
            reply_pending: false,
            rng,
            sink,
            settings,
        }
    }

    fn notify(&self, title: impl Into<String>, message: impl Into<String>) {
        self.sink.notify(Notification {
            title: title.into(),
            message: message.into(),
            duration: self.settings.notification_duration(),
        });
    }

    fn report(&self, err: AssistantError) -> AssistantError {
        tracing::warn!(error = %err, "request rejected");
        metrics::counter!("assistant_errors_total").increment(1);
        self.notify(err.title(), err.to_string());
        err
    }

    pub fn settings(&self) -> &EffectiveSettings {
        &self.settings
    }

    // sessions

    pub fn create_session(&mut self) -> ChatSession {
        self.sessions.create_session().clone()
    }

    pub fn select_session(&mut self, id: Uuid) -> bool {
        self.sessions.select_session(id)
    }

    pub fn delete_session(&mut self, id: Uuid) -> Result<(), AssistantError> {
        self.sessions.delete_session(id).map_err(|e| self.report(e))?;
        self.notify("Session deleted", "Chat session has been removed");
        Ok(())
    }

    pub fn append_message(&mut self, msg: NewMessage) -> Option<Message> {
        self.sessions.append_message(msg)
    }

    pub fn list_sessions(&self) -> &[ChatSession] {
        self.sessions.list_sessions()
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.sessions.active_session()
    }

    pub fn active_messages(&self) -> &[Message] {
        self.sessions.active_messages()
    }

    pub fn messages(&self, id: Uuid) -> &[Message] {
        self.sessions.messages(id)
    }

    // queries

    pub fn is_reply_pending(&self) -> bool {
        self.reply_pending
    }

    pub fn begin_query(
        &mut self,
        feature: Feature,
        text: &str,
    ) -> Result<PendingQuery, AssistantError> {
        if text.trim().is_empty() {
            return Err(self.report(AssistantError::EmptyMessage));
        }
        if self.reply_pending {
            return Err(self.report(AssistantError::ReplyPending));
        }
        let session_id = match self.sessions.active_session_id() {
            Some(id) => id,
            None => self.sessions.create_session().id,
        };
        let user_message = self
            .sessions
            .append_message_to(session_id, NewMessage::user(text))
            .map_err(|e| self.report(e))?;

        let request = ReplyRequest {
            feature,
            text,
            source: self.sources.current(),
            document_count: self.documents.list_documents().len(),
            uploading: self.documents.is_uploading(),
        };
        let reply = generate_reply(&request, &mut self.rng);
        self.reply_pending = true;
        metrics::counter!("assistant_queries_total").increment(1);
        tracing::debug!(%session_id, ?feature, "query accepted");
        Ok(PendingQuery {
            session_id,
            user_message,
            reply,
        })
    }

    /// Delivers the reply to the session that asked. If that session was
    /// deleted in the meantime the reply is dropped.
    pub fn complete_query(&mut self, pending: PendingQuery) -> Option<Message> {
        self.reply_pending = false;
        match self.sessions.append_message_to(pending.session_id, pending.reply.to_message()) {
            Ok(message) => {
                self.notify(
                    pending.reply.notice_title.clone(),
                    pending.reply.notice_message.clone(),
                );
                Some(message)
            }
            Err(_) => {
                tracing::debug!(
                    session_id = %pending.session_id,
                    "session gone before reply arrived"
                );
                None
            }
        }
    }

    // documents

    pub fn is_uploading(&self) -> bool {
        self.documents.is_uploading()
    }

    pub fn list_documents(&self) -> &[UploadedDocument] {
        self.documents.list_documents()
    }

    pub fn begin_upload(
        &mut self,
        files: Vec<SelectedFile>,
    ) -> Result<PendingUpload, AssistantError> {
        let pending = self.documents.begin_upload(files).map_err(|e| self.report(e))?;
        tracing::info!(files = pending.len(), "upload accepted");
        Ok(pending)
    }

    /// Documents land in the shared library; the session active at this
    /// moment is the one marked as having documents.
    pub fn complete_upload(&mut self, pending: PendingUpload) -> Vec<UploadedDocument> {
        let added = self.documents.complete_upload(pending);
        if let Some(id) = self.sessions.active_session_id() {
            self.sessions.mark_documents(id);
        }
        let n = added.len();
        self.notify(
            "Documents uploaded",
            format!("{} document{} added to your library", n, if n == 1 { "" } else { "s" }),
        );
        added
    }

    pub fn remove_document(&mut self, id: Uuid) -> Result<(), AssistantError> {
        if !self.documents.remove_document(id) {
            return Err(self.report(AssistantError::DocumentNotFound(id)));
        }
        self.notify("Document removed", "Document has been removed from your library");
        Ok(())
    }

    // data sources

    pub fn current_data_source(&self) -> &'static DataSource {
        self.sources.current()
    }

    pub fn data_sources(&self) -> &'static [DataSource] {
        self.sources.catalog()
    }

    pub fn set_data_source(&mut self, id: &str) -> Result<&'static DataSource, AssistantError> {
        self.sources.set_current(id).map_err(|e| self.report(e))
    }
}

/// Shared handle used by request handlers. The lock is released across every
/// simulated delay so other calls keep being served.
#[derive(Clone)]
pub struct SharedAssistant {
    inner: Arc<RwLock<Assistant>>,
    latency: Arc<dyn Latency>,
}

impl SharedAssistant {
    pub fn new(assistant: Assistant, latency: Arc<dyn Latency>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(assistant)),
            latency,
        }
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, Assistant> {
        self.inner.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, Assistant> {
        self.inner.write().await
    }

    /// Returns the stored question and the bot reply. The reply is `None`
    /// when its session was deleted while the reply was pending.
    ///
    /// The delay and completion run on their own task, so the pending slot
    /// is released even if the caller goes away mid-delay.
    pub async fn send_query(
        &self,
        feature: Feature,
        text: &str,
    ) -> Result<(Message, Option<Message>), AssistantError> {
        let pending = self.inner.write().await.begin_query(feature, text)?;
        let question = pending.user_message.clone();
        let inner = self.inner.clone();
        let latency = self.latency.clone();
        let reply = tokio::spawn(async move {
            latency.pause(pending.delay()).await;
            inner.write().await.complete_query(pending)
        })
        .await
        .map_err(|e| AssistantError::Internal(format!("reply task failed: {e}")))?;
        Ok((question, reply))
    }

    pub async fn upload_documents(
        &self,
        files: Vec<SelectedFile>,
    ) -> Result<Vec<UploadedDocument>, AssistantError> {
        let pending = self.inner.write().await.begin_upload(files)?;
        let inner = self.inner.clone();
        let latency = self.latency.clone();
        tokio::spawn(async move {
            latency.pause(Delay::Upload).await;
            inner.write().await.complete_upload(pending)
        })
        .await
        .map_err(|e| AssistantError::Internal(format!("upload task failed: {e}")))
    }
}
