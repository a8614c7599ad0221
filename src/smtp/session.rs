//! SMTP session state management

/// Whether the session is reading commands or collecting message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpMode {
    Command,
    ReadingBody,
}

/// Manages the state and data for a single SMTP session.
///
/// The envelope is "open" once MAIL has been accepted; whether a
/// recipient has been accepted follows from the recipient list. Neither
/// fact is stored separately, so the two can never disagree with the
/// fields they describe.
#[derive(Debug)]
pub struct SmtpSession {
    /// Set by EHLO; MAIL is refused until then. HELO does not set it.
    pub ehlo_seen: bool,
    /// Sender accepted by the current MAIL command.
    pub sender: Option<String>,
    /// Recipients verified since the last MAIL/RSET/EHLO.
    pub recipients: Vec<String>,
    pub mode: SmtpMode,
    body: Vec<String>,
}

impl SmtpSession {
    pub fn new() -> Self {
        Self {
            ehlo_seen: false,
            sender: None,
            recipients: Vec::new(),
            mode: SmtpMode::Command,
            body: Vec::new(),
        }
    }

    /// An envelope is open once MAIL has been accepted.
    pub fn mail_open(&self) -> bool {
        self.sender.is_some()
    }

    /// At least one recipient has been accepted for the open envelope.
    pub fn rcpt_accepted(&self) -> bool {
        !self.recipients.is_empty()
    }

    /// Clear sender, recipients and any partial body; `ehlo_seen` is
    /// left alone. EHLO and RSET both funnel through here.
    pub fn reset_envelope(&mut self) {
        self.sender = None;
        self.recipients.clear();
        self.body.clear();
        self.mode = SmtpMode::Command;
    }

    /// Enter body collection for the current envelope.
    pub fn begin_body(&mut self) {
        self.body.clear();
        self.mode = SmtpMode::ReadingBody;
    }

    /// Store one body line with dot-stuffing undone: a leading dot is
    /// removed once.
    pub fn push_body_line(&mut self, line: &str) {
        let line = line.strip_prefix('.').unwrap_or(line);
        self.body.push(line.to_owned());
    }

    /// Hand back the accumulated body (each line CRLF-terminated) and
    /// return to command mode. The envelope is left as it was: a
    /// follow-up DATA may reuse the same sender and recipients.
    pub fn take_body(&mut self) -> String {
        self.mode = SmtpMode::Command;
        let mut data = String::new();
        for line in std::mem::take(&mut self.body) {
            data.push_str(&line);
            data.push_str("\r\n");
        }
        data
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
