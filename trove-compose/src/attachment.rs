//! Attachment sources, generalized from the original tool's `FileAttachmentItem`/
//! `ImapMessageAttachmentItem`/`ImapPartAttachmentItem` (referenced, not kept, in
//! `examples/original_source/src/Imap/Model/MessageComposer.cpp`) into one trait so
//! [`crate::builder::Composer`] doesn't need to know which kind it's serializing.

use crate::error::ComposeError;

/// `Content-Transfer-Encoding` chosen per attachment source, per `spec.md` §4.9:
/// base64 for binary, 7bit/8bit for text, binary otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cte {
    Base64,
    SevenBit,
    EightBit,
    Binary,
}

impl Cte {
    pub fn header_value(self) -> &'static str {
        match self {
            Cte::Base64 => "base64",
            Cte::SevenBit => "7bit",
            Cte::EightBit => "8bit",
            Cte::Binary => "binary",
        }
    }
}

/// One outgoing attachment. `caption`/`mime_type`/`content_disposition` are cheap
/// metadata the composer needs up front; `read` does the (possibly fallible) work
/// of actually producing bytes, and is only called once the composer is ready to
/// serialize the part.
pub trait AttachmentSource: Send + Sync {
    fn caption(&self) -> String;
    fn mime_type(&self) -> String;
    /// Full `Content-Disposition` header value, e.g.
    /// `attachment; filename="report.pdf"`.
    fn content_disposition(&self) -> String;
    fn suggested_cte(&self) -> Cte;
    fn is_available(&self) -> bool;
    fn read(&self) -> Result<Vec<u8>, ComposeError>;
}

/// A local file picked up via the host's file picker, read straight off disk.
pub struct FileAttachment {
    pub path: std::path::PathBuf,
    pub mime_type: String,
    pub cte: Cte,
}

impl FileAttachment {
    pub fn new(path: impl Into<std::path::PathBuf>, mime_type: impl Into<String>, cte: Cte) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
            cte,
        }
    }
}

impl AttachmentSource for FileAttachment {
    fn caption(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.caption())
    }

    fn suggested_cte(&self) -> Cte {
        self.cte
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<Vec<u8>, ComposeError> {
        std::fs::read(&self.path)
            .map_err(|e| ComposeError::AttachmentUnavailable(format!("{}: {e}", self.path.display())))
    }
}

/// An attachment sourced from an already-fetched IMAP message or body part
/// (`spec.md` §6's drag-and-drop payloads name exactly this case: a message or
/// part reference dragged from the mailbox tree into the composer). The engine
/// fetches the bytes asynchronously via `trove-tasks`/`trove-model::Cache` and
/// populates `bytes` before the message is sent; `read()` surfaces
/// `AttachmentUnavailable` rather than blocking or asserting when that fetch
/// hasn't completed yet, resolving the open question in `spec.md` §9.
pub struct ImapAttachment {
    pub caption: String,
    pub mime_type: String,
    pub disposition: String,
    pub cte: Cte,
    pub bytes: Option<Vec<u8>>,
}

impl ImapAttachment {
    pub fn new(caption: impl Into<String>, mime_type: impl Into<String>, cte: Cte) -> Self {
        Self {
            caption: caption.into(),
            mime_type: mime_type.into(),
            disposition: String::new(),
            cte,
            bytes: None,
        }
    }
}

impl AttachmentSource for ImapAttachment {
    fn caption(&self) -> String {
        self.caption.clone()
    }

    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn content_disposition(&self) -> String {
        if self.disposition.is_empty() {
            format!("attachment; filename=\"{}\"", self.caption)
        } else {
            self.disposition.clone()
        }
    }

    fn suggested_cte(&self) -> Cte {
        self.cte
    }

    fn is_available(&self) -> bool {
        self.bytes.is_some()
    }

    fn read(&self) -> Result<Vec<u8>, ComposeError> {
        self.bytes
            .clone()
            .ok_or_else(|| ComposeError::AttachmentUnavailable(self.caption.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfetched_imap_attachment_is_unavailable() {
        let attachment = ImapAttachment::new("report.pdf", "application/pdf", Cte::Base64);
        assert!(!attachment.is_available());
        assert!(matches!(attachment.read(), Err(ComposeError::AttachmentUnavailable(_))));
    }

    #[test]
    fn fetched_imap_attachment_is_available() {
        let mut attachment = ImapAttachment::new("report.pdf", "application/pdf", Cte::Base64);
        attachment.bytes = Some(vec![1, 2, 3]);
        assert!(attachment.is_available());
        assert_eq!(attachment.read().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let attachment = FileAttachment::new("/nonexistent/path/does-not-exist", "text/plain", Cte::SevenBit);
        assert!(!attachment.is_available());
        assert!(attachment.read().is_err());
    }
}
