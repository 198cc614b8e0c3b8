//! The composer itself: accumulates the fields `MessageComposer` exposed as Qt
//! model setters (`setFrom`/`setRecipients`/`setSubject`/...) and serializes them
//! with `asRawMessage`'s header order and body/attachment layout, per `spec.md`
//! §4.9.

use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use crate::address::MailAddress;
use crate::attachment::{AttachmentSource, Cte};
use crate::error::ComposeError;
use crate::qp;
use crate::rfc2047;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

/// Process-wide application metadata for the `User-Agent` header, injected at
/// engine construction rather than read from global state (`spec.md` §9).
#[derive(Debug, Clone)]
pub struct UserAgent {
    pub name: String,
    pub version: String,
    pub platform: String,
}

impl UserAgent {
    fn header_value(&self) -> String {
        format!("{}/{}; {}", self.name, self.version, self.platform)
    }
}

/// One composed outgoing message. Built up via the `set_*`/`add_attachment`
/// methods, then serialized with [`Composer::build`].
pub struct Composer {
    from: MailAddress,
    recipients: Vec<(RecipientKind, MailAddress)>,
    in_reply_to: Option<String>,
    timestamp: DateTime<FixedOffset>,
    subject: String,
    text: String,
    attachments: Vec<Box<dyn AttachmentSource>>,
    user_agent: UserAgent,
}

impl Composer {
    pub fn new(from: MailAddress, timestamp: DateTime<FixedOffset>, user_agent: UserAgent) -> Self {
        Self {
            from,
            recipients: Vec::new(),
            in_reply_to: None,
            timestamp,
            subject: String::new(),
            text: String::new(),
            attachments: Vec::new(),
            user_agent,
        }
    }

    pub fn add_recipient(&mut self, kind: RecipientKind, address: MailAddress) {
        self.recipients.push((kind, address));
    }

    pub fn set_in_reply_to(&mut self, message_id: impl Into<String>) {
        self.in_reply_to = Some(message_id.into());
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn add_attachment(&mut self, attachment: Box<dyn AttachmentSource>) {
        self.attachments.push(attachment);
    }

    /// `To`/`Cc` recipients go into the serialized message; `Bcc` never does
    /// (`spec.md` §4.9) but the transport still needs them, so they're surfaced
    /// here instead.
    pub fn bcc_recipients(&self) -> Vec<String> {
        self.recipients
            .iter()
            .filter(|(kind, _)| *kind == RecipientKind::Bcc)
            .map(|(_, addr)| addr.as_smtp_mailbox())
            .collect()
    }

    /// Every envelope recipient (`To`+`Cc`+`Bcc`), for a transport's `RCPT TO`
    /// sequence — the one place `Bcc` addresses surface at all.
    pub fn envelope_recipients(&self) -> Vec<String> {
        self.recipients.iter().map(|(_, addr)| addr.as_smtp_mailbox()).collect()
    }

    fn generate_message_id(&self) -> Option<String> {
        if self.from.host.is_empty() {
            return None;
        }
        Some(format!("{}@{}", Uuid::new_v4(), self.from.host))
    }

    /// Serializes the composed message into a single RFC 5322 + MIME octet
    /// stream. Fails with [`ComposeError::AttachmentUnavailable`] the first time
    /// an attachment source reports (or turns out to be) unreadable — mirroring
    /// `asRawMessage`'s early `return false`, just as a `Result` instead of a bool.
    pub fn build(&self) -> Result<Vec<u8>, ComposeError> {
        let mut out = Vec::new();

        out.extend_from_slice(b"From: ");
        out.extend_from_slice(self.from.as_mail_header().as_bytes());
        out.extend_from_slice(b"\r\n");

        for (kind, addr) in &self.recipients {
            let header = match kind {
                RecipientKind::To => "To",
                RecipientKind::Cc => "Cc",
                RecipientKind::Bcc => continue,
            };
            out.extend_from_slice(format!("{header}: {}\r\n", addr.as_mail_header()).as_bytes());
        }

        out.extend_from_slice(format!("Subject: {}\r\n", rfc2047::encode_unstructured(&self.subject)).as_bytes());
        out.extend_from_slice(format!("Date: {}\r\n", self.timestamp.to_rfc2822()).as_bytes());
        out.extend_from_slice(format!("User-Agent: {}\r\n", self.user_agent.header_value()).as_bytes());
        out.extend_from_slice(b"MIME-Version: 1.0\r\n");

        if let Some(message_id) = self.generate_message_id() {
            out.extend_from_slice(format!("Message-ID: <{message_id}>\r\n").as_bytes());
        }
        if let Some(in_reply_to) = &self.in_reply_to {
            out.extend_from_slice(format!("In-Reply-To: {in_reply_to}\r\n").as_bytes());
        }

        // Fail fast, before writing any body bytes, if an attachment can't be
        // read — matches `asRawMessage`'s own early-exit behavior.
        for attachment in &self.attachments {
            if !attachment.is_available() {
                return Err(ComposeError::AttachmentUnavailable(attachment.caption()));
            }
        }

        let has_attachments = !self.attachments.is_empty();
        let boundary = format!("boundary_{}", Uuid::new_v4());

        if has_attachments {
            out.extend_from_slice(
                format!(
                    "Content-Type: multipart/mixed;\r\n\tboundary=\"{boundary}\"\r\n\
                     \r\nThis is a multipart/mixed message in MIME format.\r\n\r\n\
                     --{boundary}\r\n"
                )
                .as_bytes(),
            );
        }

        out.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
        out.extend_from_slice(b"Content-Transfer-Encoding: quoted-printable\r\n\r\n");
        out.extend_from_slice(&qp::encode(self.text.as_bytes()));

        if has_attachments {
            for attachment in &self.attachments {
                let bytes = attachment
                    .read()
                    .map_err(|_| ComposeError::AttachmentUnavailable(attachment.caption()))?;

                out.extend_from_slice(format!("\r\n--{boundary}\r\n").as_bytes());
                out.extend_from_slice(format!("Content-Type: {}\r\n", attachment.mime_type()).as_bytes());
                out.extend_from_slice(format!("Content-Disposition: {}\r\n", attachment.content_disposition()).as_bytes());

                let cte = attachment.suggested_cte();
                out.extend_from_slice(format!("Content-Transfer-Encoding: {}\r\n\r\n", cte.header_value()).as_bytes());

                match cte {
                    Cte::Base64 => {
                        use base64::engine::general_purpose::STANDARD;
                        use base64::Engine;
                        // 57 raw bytes -> 76 base64 chars, the line width spec.md
                        // §4.9 calls for.
                        for chunk in bytes.chunks(57) {
                            out.extend_from_slice(STANDARD.encode(chunk).as_bytes());
                            out.extend_from_slice(b"\r\n");
                        }
                    }
                    Cte::SevenBit | Cte::EightBit | Cte::Binary => {
                        out.extend_from_slice(&bytes);
                    }
                }
            }
            out.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::FileAttachment;
    use chrono::TimeZone;

    fn user_agent() -> UserAgent {
        UserAgent {
            name: "trove".to_string(),
            version: "0.1.0".to_string(),
            platform: "test".to_string(),
        }
    }

    fn timestamp() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
            .unwrap()
    }

    /// `spec.md` §8 scenario 5: `from="a@b"`, `to=["c@d"]`, `subject="Héllo"`,
    /// `text="line\n"` produces an RFC 2047-encoded `Subject`, a CRLF-terminated
    /// body.
    #[test]
    fn composer_round_trip_scenario() {
        let mut composer = Composer::new(
            MailAddress::new(None, "a", "b"),
            timestamp(),
            user_agent(),
        );
        composer.add_recipient(RecipientKind::To, MailAddress::new(None, "c", "d"));
        composer.set_subject("Héllo");
        composer.set_text("line\n");

        let raw = composer.build().unwrap();
        let text = String::from_utf8(raw).unwrap();

        assert!(text.contains("From: a@b\r\n"));
        assert!(text.contains("To: c@d\r\n"));
        assert!(text.contains("Subject: =?UTF-8?B?"));
        assert!(text.contains("Content-Transfer-Encoding: quoted-printable"));
        assert!(text.ends_with("line\r\n"));
    }

    #[test]
    fn bcc_is_never_written_to_the_body_but_is_returned_separately() {
        let mut composer = Composer::new(MailAddress::new(None, "a", "b"), timestamp(), user_agent());
        composer.add_recipient(RecipientKind::To, MailAddress::new(None, "c", "d"));
        composer.add_recipient(RecipientKind::Bcc, MailAddress::new(None, "secret", "watchers"));
        composer.set_text("hi\n");

        let raw = composer.build().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(!text.contains("secret@watchers"));
        assert_eq!(composer.bcc_recipients(), vec!["secret@watchers".to_string()]);
        assert_eq!(
            composer.envelope_recipients(),
            vec!["c@d".to_string(), "secret@watchers".to_string()]
        );
    }

    #[test]
    fn unavailable_attachment_fails_the_whole_build() {
        let mut composer = Composer::new(MailAddress::new(None, "a", "b"), timestamp(), user_agent());
        composer.set_text("hi\n");
        composer.add_attachment(Box::new(FileAttachment::new(
            "/nonexistent/path",
            "text/plain",
            Cte::SevenBit,
        )));

        assert!(matches!(composer.build(), Err(ComposeError::AttachmentUnavailable(_))));
    }

    #[test]
    fn attachments_produce_a_multipart_mixed_envelope() {
        let mut composer = Composer::new(MailAddress::new(None, "a", "b"), timestamp(), user_agent());
        composer.set_text("hi\n");

        struct InMemory;
        impl AttachmentSource for InMemory {
            fn caption(&self) -> String {
                "data.bin".to_string()
            }
            fn mime_type(&self) -> String {
                "application/octet-stream".to_string()
            }
            fn content_disposition(&self) -> String {
                "attachment; filename=\"data.bin\"".to_string()
            }
            fn suggested_cte(&self) -> Cte {
                Cte::Base64
            }
            fn is_available(&self) -> bool {
                true
            }
            fn read(&self) -> Result<Vec<u8>, ComposeError> {
                Ok(vec![0u8; 200])
            }
        }
        composer.add_attachment(Box::new(InMemory));

        let raw = composer.build().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("Content-Type: multipart/mixed;"));
        assert!(text.contains("Content-Disposition: attachment; filename=\"data.bin\""));
        assert!(text.trim_end().ends_with("--"));
        for line in text.split("\r\n") {
            assert!(line.len() <= 76);
        }
    }
}
