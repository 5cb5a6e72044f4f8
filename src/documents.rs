use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssistantError;

/// What a file picker hands over: metadata only, never content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadedDocument {
    pub id: Uuid,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub upload_date: DateTime<Utc>,
}

impl UploadedDocument {
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_mime(&self.mime_type)
    }

    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Spreadsheet,
    Word,
    Other,
}

impl DocumentKind {
    pub fn from_mime(mime: &str) -> Self {
        let m = mime.to_ascii_lowercase();
        if m.contains("pdf") {
            Self::Pdf
        } else if m.contains("spreadsheet") || m.contains("excel") || m.contains("xlsx") {
            Self::Spreadsheet
        } else if m.contains("word") || m.contains("document") || m.contains("docx") {
            Self::Word
        } else {
            Self::Other
        }
    }
}

pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.1} MB", b as f64 / MB as f64),
        b => format!("{:.1} GB", b as f64 / GB as f64),
    }
}

/// Files accepted for upload but not yet visible in the library.
#[derive(Debug)]
pub struct PendingUpload {
    files: Vec<SelectedFile>,
}

impl PendingUpload {
    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

/// The document library shared by every session.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: Vec<UploadedDocument>,
    uploading: bool,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_upload(
        &mut self,
        files: Vec<SelectedFile>,
    ) -> Result<PendingUpload, AssistantError> {
        if self.uploading {
            return Err(AssistantError::UploadInProgress);
        }
        if files.is_empty() {
            return Err(AssistantError::NoFiles);
        }
        self.uploading = true;
        tracing::debug!(files = files.len(), "upload started");
        Ok(PendingUpload { files })
    }

    pub fn complete_upload(&mut self, pending: PendingUpload) -> Vec<UploadedDocument> {
        let now = Utc::now();
        let added: Vec<UploadedDocument> = pending
            .files
            .into_iter()
            .map(|f| UploadedDocument {
                id: Uuid::new_v4(),
                name: f.name,
                size: f.size,
                mime_type: f.mime_type,
                upload_date: now,
            })
            .collect();
        self.documents.extend(added.iter().cloned());
        self.uploading = false;
        metrics::counter!("assistant_documents_uploaded_total").increment(added.len() as u64);
        tracing::info!(count = added.len(), total = self.documents.len(), "upload completed");
        added
    }

    pub fn remove_document(&mut self, id: Uuid) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        self.documents.len() != before
    }

    pub fn list_documents(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64, mime: &str) -> SelectedFile {
        SelectedFile {
            name: name.into(),
            size,
            mime_type: mime.into(),
        }
    }

    #[test]
    fn documents_appear_only_after_completion() {
        let mut store = DocumentStore::new();
        let pending = store
            .begin_upload(vec![file("a.pdf", 10, "application/pdf"), file("b.csv", 20, "text/csv")])
            .unwrap();
        assert!(store.is_uploading());
        assert!(store.list_documents().is_empty());
        assert_eq!(pending.len(), 2);

        let added = store.complete_upload(pending);
        assert!(!store.is_uploading());
        assert_eq!(added.len(), 2);
        assert_eq!(store.list_documents().len(), 2);
        assert_eq!(store.list_documents()[1].name, "b.csv");
        assert_eq!(store.list_documents()[1].size, 20);
        assert_ne!(added[0].id, added[1].id);
    }

    #[test]
    fn second_batch_rejected_while_uploading() {
        let mut store = DocumentStore::new();
        let pending = store.begin_upload(vec![file("a.pdf", 1, "application/pdf")]).unwrap();
        let err = store.begin_upload(vec![file("b.pdf", 1, "application/pdf")]).unwrap_err();
        assert_eq!(err, AssistantError::UploadInProgress);
        store.complete_upload(pending);
        assert!(store.begin_upload(vec![file("b.pdf", 1, "application/pdf")]).is_ok());
    }

    #[test]
    fn empty_batch_rejected_without_raising_flag() {
        let mut store = DocumentStore::new();
        assert_eq!(store.begin_upload(vec![]).unwrap_err(), AssistantError::NoFiles);
        assert!(!store.is_uploading());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut store = DocumentStore::new();
        let pending = store.begin_upload(vec![file("a.pdf", 1, "application/pdf")]).unwrap();
        let added = store.complete_upload(pending);
        assert!(!store.remove_document(Uuid::new_v4()));
        assert_eq!(store.list_documents().len(), 1);
        assert!(store.remove_document(added[0].id));
        assert!(store.list_documents().is_empty());
    }

    #[test]
    fn file_sizes_are_human_readable() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2_500_000), "2.4 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn kinds_follow_mime_type() {
        assert_eq!(DocumentKind::from_mime("application/pdf"), DocumentKind::Pdf);
        assert_eq!(
            DocumentKind::from_mime("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            DocumentKind::Spreadsheet
        );
        assert_eq!(
            DocumentKind::from_mime("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            DocumentKind::Word
        );
        assert_eq!(DocumentKind::from_mime("text/plain"), DocumentKind::Other);
    }
}
