use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssistantError;

pub const WELCOME_MESSAGE: &str = "Hello! I'm your AI assistant. How can I help you analyze your data today?";
pub const INITIAL_PREVIEW: &str = "Start a new conversation";
pub const TITLE_MAX_CHARS: usize = 30;

static GENERATED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^New Chat \d+$").expect("static regex"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub seq: u64,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub show_graph: bool,
    pub show_table: bool,
    pub document_reference: Option<String>,
}

/// Everything the caller decides about a message; the store fills in id,
/// sequence number and timestamp.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub sender: Sender,
    #[serde(default)]
    pub show_graph: bool,
    #[serde(default)]
    pub show_table: bool,
    #[serde(default)]
    pub document_reference: Option<String>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            show_graph: false,
            show_table: false,
            document_reference: None,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Bot,
            show_graph: false,
            show_table: false,
            document_reference: None,
        }
    }

    pub fn with_graph(mut self, show: bool) -> Self {
        self.show_graph = show;
        self
    }

    pub fn with_table(mut self, show: bool) -> Self {
        self.show_table = show;
        self
    }

    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.document_reference = reference;
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub preview: String,
    pub has_documents: bool,
    pub has_visualizations: bool,
}

impl ChatSession {
    fn new(n: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: format!("New Chat {}", n),
            timestamp: Utc::now(),
            preview: INITIAL_PREVIEW.to_string(),
            has_documents: false,
            has_visualizations: false,
        }
    }

    pub fn has_generated_title(&self) -> bool {
        GENERATED_TITLE.is_match(&self.title)
    }

    /// Preview cut down for the session list. The stored preview stays whole.
    pub fn preview_excerpt(&self, max_chars: usize) -> String {
        truncate_chars(&self.preview, max_chars)
    }
}

/// First `max_chars` characters, with an ellipsis when anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Sessions, newest first, each owning its ordered message list.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    messages: HashMap<Uuid, Vec<Message>>,
    active: Option<Uuid>,
    created: u64,
    next_seq: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&mut self) -> &ChatSession {
        self.created += 1;
        let session = ChatSession::new(self.created);
        let id = session.id;
        let welcome = self.stamp(NewMessage::bot(WELCOME_MESSAGE));
        self.messages.insert(id, vec![welcome]);
        self.sessions.insert(0, session);
        self.active = Some(id);
        metrics::counter!("assistant_sessions_created_total").increment(1);
        tracing::info!(session_id = %id, "session created");
        &self.sessions[0]
    }

    /// Unknown ids leave the active session untouched.
    pub fn select_session(&mut self, id: Uuid) -> bool {
        if self.get(id).is_none() {
            tracing::debug!(session_id = %id, "ignoring selection of unknown session");
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn delete_session(&mut self, id: Uuid) -> Result<(), AssistantError> {
        let pos = self
            .sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or(AssistantError::SessionNotFound(id))?;
        self.sessions.remove(pos);
        self.messages.remove(&id);
        tracing::info!(session_id = %id, "session deleted");

        if self.active == Some(id) {
            match self.sessions.first() {
                Some(next) => self.active = Some(next.id),
                None => {
                    self.active = None;
                    self.create_session();
                }
            }
        }
        Ok(())
    }

    pub fn append_message(&mut self, msg: NewMessage) -> Option<Message> {
        let id = self.active?;
        self.append_message_to(id, msg).ok()
    }

    pub fn append_message_to(
        &mut self,
        id: Uuid,
        msg: NewMessage,
    ) -> Result<Message, AssistantError> {
        if self.get(id).is_none() {
            return Err(AssistantError::SessionNotFound(id));
        }
        let message = self.stamp(msg);
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AssistantError::SessionNotFound(id))?;

        if message.sender == Sender::User && session.has_generated_title() {
            session.title = truncate_chars(&message.content, TITLE_MAX_CHARS);
        }
        session.preview = message.content.clone();
        session.timestamp = message.timestamp;
        session.has_visualizations |= message.show_graph || message.show_table;

        self.messages.entry(id).or_default().push(message.clone());
        Ok(message)
    }

    pub fn mark_documents(&mut self, id: Uuid) {
        if let Some(s) = self.sessions.iter_mut().find(|s| s.id == id) {
            s.has_documents = true;
        }
    }

    pub fn list_sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn active_session_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn active_session(&self) -> Option<&ChatSession> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn messages(&self, id: Uuid) -> &[Message] {
        self.messages.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn active_messages(&self) -> &[Message] {
        match self.active {
            Some(id) => self.messages(id),
            None => &[],
        }
    }

    fn stamp(&mut self, msg: NewMessage) -> Message {
        self.next_seq += 1;
        Message {
            id: Uuid::now_v7(),
            seq: self.next_seq,
            content: msg.content,
            sender: msg.sender,
            timestamp: Utc::now(),
            show_graph: msg.show_graph,
            show_table: msg.show_table,
            document_reference: msg.document_reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_session_is_new_chat_1_with_welcome() {
        let mut store = SessionStore::new();
        let id = store.create_session().id;
        assert_eq!(store.list_sessions().len(), 1);
        let s = store.active_session().unwrap();
        assert_eq!(s.id, id);
        assert_eq!(s.title, "New Chat 1");
        assert_eq!(s.preview, INITIAL_PREVIEW);
        let msgs = store.active_messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender, Sender::Bot);
        assert_eq!(msgs[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn sessions_listed_newest_first() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        let b = store.create_session().id;
        let ids: Vec<_> = store.list_sessions().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![b, a]);
        assert_eq!(store.list_sessions()[0].title, "New Chat 2");
        assert_eq!(store.active_session_id(), Some(b));
    }

    #[test]
    fn short_user_message_becomes_title_and_preview() {
        let mut store = SessionStore::new();
        store.create_session();
        store.append_message(NewMessage::user("Show me sales by city")).unwrap();
        let s = store.active_session().unwrap();
        assert_eq!(s.title, "Show me sales by city");
        assert_eq!(s.preview, "Show me sales by city");
    }

    #[test]
    fn long_user_message_title_is_truncated() {
        let mut store = SessionStore::new();
        store.create_session();
        let text = "Compare revenue across all regions for the last four quarters";
        store.append_message(NewMessage::user(text)).unwrap();
        let s = store.active_session().unwrap();
        assert_eq!(s.title, "Compare revenue across all reg…");
        assert_eq!(s.title.chars().count(), TITLE_MAX_CHARS + 1);
        assert_eq!(s.preview, text);
    }

    #[test]
    fn title_only_derived_once() {
        let mut store = SessionStore::new();
        store.create_session();
        store.append_message(NewMessage::user("first question")).unwrap();
        store.append_message(NewMessage::user("second question")).unwrap();
        assert_eq!(store.active_session().unwrap().title, "first question");
        assert_eq!(store.active_session().unwrap().preview, "second question");
    }

    #[test]
    fn bot_messages_do_not_rename() {
        let mut store = SessionStore::new();
        store.create_session();
        store.append_message(NewMessage::bot("hi there").with_graph(true)).unwrap();
        let s = store.active_session().unwrap();
        assert_eq!(s.title, "New Chat 1");
        assert!(s.has_visualizations);
    }

    #[test]
    fn table_flag_marks_visualizations() {
        let mut store = SessionStore::new();
        store.create_session();
        store.append_message(NewMessage::bot("x")).unwrap();
        assert!(!store.active_session().unwrap().has_visualizations);
        store.append_message(NewMessage::bot("y").with_table(true)).unwrap();
        assert!(store.active_session().unwrap().has_visualizations);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(31);
        let cut = truncate_chars(&text, 30);
        assert_eq!(cut, format!("{}…", "é".repeat(30)));
        assert_eq!(truncate_chars("abc", 30), "abc");
        assert_eq!(truncate_chars(&"a".repeat(30), 30), "a".repeat(30));
    }

    #[test]
    fn preview_excerpt_leaves_storage_intact() {
        let mut store = SessionStore::new();
        store.create_session();
        store.append_message(NewMessage::bot("0123456789")).unwrap();
        let s = store.active_session().unwrap();
        assert_eq!(s.preview_excerpt(4), "0123…");
        assert_eq!(s.preview, "0123456789");
    }

    #[test]
    fn select_unknown_is_noop() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        assert!(!store.select_session(Uuid::new_v4()));
        assert_eq!(store.active_session_id(), Some(a));
    }

    #[test]
    fn messages_stay_with_their_session() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        store.append_message(NewMessage::user("in a")).unwrap();
        let b = store.create_session().id;
        store.append_message(NewMessage::user("in b")).unwrap();
        assert_eq!(store.messages(a).len(), 2);
        assert_eq!(store.messages(b).len(), 2);
        assert_eq!(store.messages(a)[1].content, "in a");

        assert!(store.select_session(a));
        assert_eq!(store.active_messages()[1].content, "in a");
    }

    #[test]
    fn deleting_active_with_one_other_selects_it() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        let b = store.create_session().id;
        store.delete_session(b).unwrap();
        assert_eq!(store.list_sessions().len(), 1);
        assert_eq!(store.active_session_id(), Some(a));
    }

    #[test]
    fn deleting_only_session_creates_fresh_one() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        store.append_message(NewMessage::user("hello")).unwrap();
        store.delete_session(a).unwrap();
        assert_eq!(store.list_sessions().len(), 1);
        let fresh = store.active_session().unwrap();
        assert_ne!(fresh.id, a);
        assert!(fresh.has_generated_title());
        assert_eq!(store.active_messages().len(), 1);
        assert!(store.messages(a).is_empty());
    }

    #[test]
    fn deleting_inactive_keeps_active() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        let b = store.create_session().id;
        store.delete_session(a).unwrap();
        assert_eq!(store.active_session_id(), Some(b));
    }

    #[test]
    fn deleting_unknown_reports_not_found() {
        let mut store = SessionStore::new();
        store.create_session();
        let ghost = Uuid::new_v4();
        assert_eq!(store.delete_session(ghost), Err(AssistantError::SessionNotFound(ghost)));
        assert_eq!(store.list_sessions().len(), 1);
    }

    #[test]
    fn deleted_session_cannot_be_appended_to() {
        let mut store = SessionStore::new();
        let a = store.create_session().id;
        store.create_session();
        store.delete_session(a).unwrap();
        let err = store.append_message_to(a, NewMessage::bot("late")).unwrap_err();
        assert_eq!(err, AssistantError::SessionNotFound(a));
    }

    #[test]
    fn append_without_sessions_is_rejected() {
        let mut store = SessionStore::new();
        assert!(store.append_message(NewMessage::user("nobody home")).is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        DeleteActive,
        DeleteNth(usize),
        SelectNth(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            Just(Op::DeleteActive),
            (0usize..8).prop_map(Op::DeleteNth),
            (0usize..8).prop_map(Op::SelectNth),
        ]
    }

    proptest! {
        #[test]
        fn prop_active_session_always_reachable(
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let mut store = SessionStore::new();
            for op in ops {
                match op {
                    Op::Create => { store.create_session(); }
                    Op::DeleteActive => {
                        if let Some(id) = store.active_session_id() {
                            store.delete_session(id).unwrap();
                        }
                    }
                    Op::DeleteNth(n) => {
                        if let Some(id) = store.list_sessions().get(n).map(|s| s.id) {
                            store.delete_session(id).unwrap();
                        }
                    }
                    Op::SelectNth(n) => {
                        if let Some(id) = store.list_sessions().get(n).map(|s| s.id) {
                            prop_assert!(store.select_session(id));
                        }
                    }
                }
                if !store.list_sessions().is_empty() {
                    prop_assert!(store.active_session().is_some());
                }
            }
        }

        #[test]
        fn prop_messages_keep_append_order(
            contents in prop::collection::vec("[a-z ]{0,40}", 1..50)
        ) {
            let mut store = SessionStore::new();
            store.create_session();
            for (i, c) in contents.iter().enumerate() {
                let msg = if i % 2 == 0 {
                    NewMessage::user(c.clone())
                } else {
                    NewMessage::bot(c.clone())
                };
                store.append_message(msg).unwrap();
            }
            let msgs = store.active_messages();
            prop_assert_eq!(msgs.len(), contents.len() + 1);
            for (m, c) in msgs[1..].iter().zip(contents.iter()) {
                prop_assert_eq!(&m.content, c);
            }
            for w in msgs.windows(2) {
                prop_assert!(w[0].seq < w[1].seq);
            }
        }
    }
}
