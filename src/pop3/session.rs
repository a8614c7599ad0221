//! POP3 session state management

use crate::store::MailList;

/// State of a POP3 session. Advances strictly forward; it never
/// regresses within one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pop3State {
    /// Waiting for USER and PASS.
    Authorization,
    /// Authenticated; the mail list is loaded and valid.
    Transaction,
    /// QUIT was answered in transaction state; deleted messages purged.
    Update,
}

/// Per-connection state for one POP3 session.
#[derive(Debug)]
pub struct Pop3Session {
    pub state: Pop3State,
    /// Mailbox named by the most recent successful USER command.
    /// Cleared again when a later USER fails.
    pub pending_user: Option<String>,
    /// Verb of the previous command line, uppercased, recognized or not.
    pub last_verb: Option<String>,
    /// Loaded mailbox; present exactly while in transaction state.
    pub mail_list: Option<MailList>,
    /// Set once QUIT has been answered; the server closes the connection.
    pub closed: bool,
}

impl Pop3Session {
    pub fn new() -> Self {
        Self {
            state: Pop3State::Authorization,
            pending_user: None,
            last_verb: None,
            mail_list: None,
            closed: false,
        }
    }

    /// PASS is legal only directly after a successful USER, while still
    /// unauthenticated.
    pub fn pass_allowed(&self) -> bool {
        self.state == Pop3State::Authorization
            && self.pending_user.is_some()
            && self.last_verb.as_deref() == Some("USER")
    }

    pub fn record_verb(&mut self, verb: &str) {
        self.last_verb = Some(verb.to_ascii_uppercase());
    }

    pub fn enter_transaction(&mut self, list: MailList) {
        self.state = Pop3State::Transaction;
        self.mail_list = Some(list);
    }
}

impl Default for Pop3Session {
    fn default() -> Self {
        Self::new()
    }
}
