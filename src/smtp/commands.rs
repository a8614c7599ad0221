//! Implementation of SMTP commands

use std::sync::Arc;

use crate::command::{Command, CommandError};
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::store::MailStore;

/// Known SMTP verbs, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmtpVerb {
    Ehlo,
    Helo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Noop,
    Vrfy,
    Help,
    Expn,
    Quit,
}

const VERBS: &[(&str, SmtpVerb)] = &[
    ("EHLO", SmtpVerb::Ehlo),
    ("HELO", SmtpVerb::Helo),
    ("MAIL", SmtpVerb::Mail),
    ("RCPT", SmtpVerb::Rcpt),
    ("DATA", SmtpVerb::Data),
    ("RSET", SmtpVerb::Rset),
    ("NOOP", SmtpVerb::Noop),
    ("VRFY", SmtpVerb::Vrfy),
    ("HELP", SmtpVerb::Help),
    ("EXPN", SmtpVerb::Expn),
    ("QUIT", SmtpVerb::Quit),
];

impl SmtpVerb {
    fn lookup(verb: &str) -> Option<Self> {
        VERBS
            .iter()
            .find(|(name, _)| verb.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
    }
}

/// Handles SMTP commands and returns appropriate responses
pub struct SmtpCommandHandler {
    hostname: String,
    store: Arc<dyn MailStore>,
}

impl SmtpCommandHandler {
    pub fn new(hostname: &str, store: Arc<dyn MailStore>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            store,
        }
    }

    /// Process a command line and return a response.
    ///
    /// Errors other than I/O map to numeric error replies; the session
    /// continues.
    pub fn process_command(
        &self,
        line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Err(SmtpError::Unrecognized),
            Err(CommandError::TooManyTokens { .. }) => return Err(SmtpError::BadSyntax),
        };

        match SmtpVerb::lookup(&command.verb) {
            Some(SmtpVerb::Ehlo) => self.handle_ehlo(&command, session),
            Some(SmtpVerb::Helo) => self.handle_helo(&command),
            Some(SmtpVerb::Mail) => self.handle_mail(&command, session),
            Some(SmtpVerb::Rcpt) => self.handle_rcpt(&command, session),
            Some(SmtpVerb::Data) => self.handle_data(&command, session),
            Some(SmtpVerb::Rset) => self.handle_rset(&command, session),
            Some(SmtpVerb::Noop) => self.handle_noop(&command),
            Some(SmtpVerb::Vrfy) => self.handle_vrfy(&command),
            Some(SmtpVerb::Help) | Some(SmtpVerb::Expn) => Err(SmtpError::NotImplemented),
            Some(SmtpVerb::Quit) => self.handle_quit(&command),
            None => Err(SmtpError::Unrecognized),
        }
    }

    /// EHLO resets the whole envelope; HELO (below) greets only.
    fn handle_ehlo(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 1 {
            return Err(SmtpError::BadSyntax);
        }

        session.reset_envelope();
        session.ehlo_seen = true;
        Ok(SmtpResponse::hello(&self.hostname, &command.args[0]))
    }

    fn handle_helo(&self, command: &Command) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 1 {
            return Err(SmtpError::BadSyntax);
        }

        Ok(SmtpResponse::hello(&self.hostname, &command.args[0]))
    }

    fn handle_mail(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() == 0 {
            return Err(SmtpError::BadSyntax);
        }

        // Malformed arguments are reported before the missing-EHLO check.
        let addr = parse_path(&command.args.join(" "), "FROM")?;
        if !session.ehlo_seen {
            return Err(SmtpError::BadSequence);
        }

        session.sender = Some(addr);
        Ok(SmtpResponse::ok())
    }

    fn handle_rcpt(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() == 0 {
            return Err(SmtpError::BadSyntax);
        }

        let addr = parse_path(&command.args.join(" "), "TO")?;
        if !session.mail_open() {
            return Err(SmtpError::BadSequence);
        }
        if !self.store.user_exists(&addr) {
            return Err(SmtpError::NoSuchUser(addr));
        }

        session.recipients.push(addr);
        Ok(SmtpResponse::ok())
    }

    fn handle_data(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 0 {
            return Err(SmtpError::BadSyntax);
        }
        if !session.mail_open() || !session.rcpt_accepted() {
            return Err(SmtpError::BadSequence);
        }

        session.begin_body();
        Ok(SmtpResponse::data_start())
    }

    fn handle_rset(
        &self,
        command: &Command,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 0 {
            return Err(SmtpError::BadSyntax);
        }

        session.reset_envelope();
        Ok(SmtpResponse::ok())
    }

    fn handle_noop(&self, command: &Command) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 0 {
            return Err(SmtpError::BadSyntax);
        }

        Ok(SmtpResponse::ok())
    }

    fn handle_vrfy(&self, command: &Command) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 1 {
            return Err(SmtpError::BadSyntax);
        }

        if self.store.user_exists(&command.args[0]) {
            Ok(SmtpResponse::ok())
        } else {
            Err(SmtpError::Unverified)
        }
    }

    fn handle_quit(&self, command: &Command) -> Result<SmtpResponse, SmtpError> {
        if command.arg_count() != 0 {
            return Err(SmtpError::BadSyntax);
        }

        Ok(SmtpResponse::quit())
    }
}

/// Parse a `FROM:<addr>` / `TO:<addr>` argument and return the address.
/// The keyword is case-insensitive; the address must be angle-bracketed
/// and non-empty.
fn parse_path(argument: &str, keyword: &str) -> Result<String, SmtpError> {
    let (head, rest) = argument.split_once(':').ok_or(SmtpError::BadSyntax)?;
    if !head.eq_ignore_ascii_case(keyword) {
        return Err(SmtpError::BadSyntax);
    }

    let addr = rest
        .trim()
        .strip_prefix('<')
        .and_then(|path| path.strip_suffix('>'))
        .ok_or(SmtpError::BadSyntax)?;
    if addr.is_empty() {
        return Err(SmtpError::BadSyntax);
    }

    Ok(addr.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_user("recipient@example.com", "pw");
        store
    }

    fn create_handler() -> SmtpCommandHandler {
        SmtpCommandHandler::new("test.local", seeded_store())
    }

    fn greeted(handler: &SmtpCommandHandler) -> SmtpSession {
        let mut session = SmtpSession::new();
        handler
            .process_command("EHLO client.local", &mut session)
            .unwrap();
        session
    }

    fn with_open_envelope(handler: &SmtpCommandHandler) -> SmtpSession {
        let mut session = greeted(handler);
        handler
            .process_command("MAIL FROM:<sender@example.com>", &mut session)
            .unwrap();
        handler
            .process_command("RCPT TO:<recipient@example.com>", &mut session)
            .unwrap();
        session
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("FROM:<a@b>", "FROM").unwrap(), "a@b");
        assert_eq!(parse_path("from:<a@b>", "FROM").unwrap(), "a@b");
        assert_eq!(parse_path("TO: <a@b>", "TO").unwrap(), "a@b");

        assert!(parse_path("FROM:a@b", "FROM").is_err());
        assert!(parse_path("FROM:<>", "FROM").is_err());
        assert!(parse_path("FROM<a@b>", "FROM").is_err());
        assert!(parse_path("TO:<a@b>", "FROM").is_err());
    }

    #[test]
    fn test_ehlo_greets_and_resets() {
        let handler = create_handler();
        let mut session = with_open_envelope(&handler);

        let response = handler
            .process_command("EHLO other.local", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
        assert_eq!(response.message, "test.local Hello other.local");
        assert!(session.ehlo_seen);
        assert!(!session.mail_open());
        assert!(!session.rcpt_accepted());
    }

    #[test]
    fn test_ehlo_requires_domain() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        assert!(matches!(
            handler.process_command("EHLO", &mut session),
            Err(SmtpError::BadSyntax)
        ));
        assert!(matches!(
            handler.process_command("EHLO a b", &mut session),
            Err(SmtpError::BadSyntax)
        ));
    }

    #[test]
    fn test_helo_greets_without_enabling_mail() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        let response = handler
            .process_command("HELO client.local", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
        assert!(!session.ehlo_seen);

        // Only EHLO unlocks MAIL.
        let result = handler.process_command("MAIL FROM:<a@b>", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSequence)));
    }

    #[test]
    fn test_helo_does_not_reset_envelope() {
        let handler = create_handler();
        let mut session = with_open_envelope(&handler);

        handler
            .process_command("HELO client.local", &mut session)
            .unwrap();
        assert!(session.mail_open());
        assert!(session.rcpt_accepted());
    }

    #[test]
    fn test_mail_sets_sender() {
        let handler = create_handler();
        let mut session = greeted(&handler);

        let response = handler
            .process_command("MAIL FROM:<sender@example.com>", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
        assert_eq!(session.sender.as_deref(), Some("sender@example.com"));
    }

    #[test]
    fn test_mail_malformed_reported_before_sequence() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        // No EHLO yet, but the argument is malformed: 501 wins.
        let result = handler.process_command("MAIL sender@example.com", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSyntax)));

        let result = handler.process_command("MAIL FROM:<a@b>", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSequence)));
    }

    #[test]
    fn test_mail_rejects_empty_address() {
        let handler = create_handler();
        let mut session = greeted(&handler);

        let result = handler.process_command("MAIL FROM:<>", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSyntax)));
    }

    #[test]
    fn test_mail_keyword_case_insensitive_address_preserved() {
        let handler = create_handler();
        let mut session = greeted(&handler);

        handler
            .process_command("mail from:<Sender@Example.COM>", &mut session)
            .unwrap();
        assert_eq!(session.sender.as_deref(), Some("Sender@Example.COM"));
    }

    #[test]
    fn test_rcpt_requires_mail() {
        let handler = create_handler();
        let mut session = greeted(&handler);

        let result = handler.process_command("RCPT TO:<recipient@example.com>", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSequence)));
    }

    #[test]
    fn test_rcpt_verifies_recipient() {
        let handler = create_handler();
        let mut session = greeted(&handler);
        handler
            .process_command("MAIL FROM:<sender@example.com>", &mut session)
            .unwrap();

        let result = handler.process_command("RCPT TO:<ghost@example.com>", &mut session);
        assert!(matches!(result, Err(SmtpError::NoSuchUser(_))));
        assert!(session.recipients.is_empty());
        assert!(!session.rcpt_accepted());

        // A later RCPT to a valid user still succeeds.
        let response = handler
            .process_command("RCPT TO:<recipient@example.com>", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");
        assert_eq!(session.recipients, vec!["recipient@example.com"]);
    }

    #[test]
    fn test_data_requires_rcpt() {
        let handler = create_handler();
        let mut session = greeted(&handler);

        assert!(matches!(
            handler.process_command("DATA", &mut session),
            Err(SmtpError::BadSequence)
        ));

        handler
            .process_command("MAIL FROM:<sender@example.com>", &mut session)
            .unwrap();
        assert!(matches!(
            handler.process_command("DATA", &mut session),
            Err(SmtpError::BadSequence)
        ));
    }

    #[test]
    fn test_data_enters_body_mode() {
        let handler = create_handler();
        let mut session = with_open_envelope(&handler);

        let response = handler.process_command("DATA", &mut session).unwrap();
        assert_eq!(response.code, "354");
        assert_eq!(session.mode, crate::smtp::session::SmtpMode::ReadingBody);
    }

    #[test]
    fn test_data_takes_no_arguments() {
        let handler = create_handler();
        let mut session = with_open_envelope(&handler);

        let result = handler.process_command("DATA now", &mut session);
        assert!(matches!(result, Err(SmtpError::BadSyntax)));
    }

    #[test]
    fn test_rset_clears_envelope() {
        let handler = create_handler();
        let mut session = with_open_envelope(&handler);

        let response = handler.process_command("RSET", &mut session).unwrap();
        assert_eq!(response.code, "250");
        assert!(!session.mail_open());
        assert!(!session.rcpt_accepted());
        assert!(session.ehlo_seen);
    }

    #[test]
    fn test_noop_takes_no_arguments() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        assert_eq!(
            handler.process_command("NOOP", &mut session).unwrap().code,
            "250"
        );
        assert!(matches!(
            handler.process_command("NOOP please", &mut session),
            Err(SmtpError::BadSyntax)
        ));
    }

    #[test]
    fn test_vrfy() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        let response = handler
            .process_command("VRFY recipient@example.com", &mut session)
            .unwrap();
        assert_eq!(response.code, "250");

        assert!(matches!(
            handler.process_command("VRFY ghost@example.com", &mut session),
            Err(SmtpError::Unverified)
        ));
        assert!(matches!(
            handler.process_command("VRFY", &mut session),
            Err(SmtpError::BadSyntax)
        ));
    }

    #[test]
    fn test_help_and_expn_not_implemented() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        assert!(matches!(
            handler.process_command("HELP", &mut session),
            Err(SmtpError::NotImplemented)
        ));
        assert!(matches!(
            handler.process_command("EXPN list", &mut session),
            Err(SmtpError::NotImplemented)
        ));
    }

    #[test]
    fn test_quit() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        let response = handler.process_command("QUIT", &mut session).unwrap();
        assert_eq!(response.code, "221");

        assert!(matches!(
            handler.process_command("QUIT now", &mut session),
            Err(SmtpError::BadSyntax)
        ));
    }

    #[test]
    fn test_unrecognized_command() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        let result = handler.process_command("TURN", &mut session);
        assert!(matches!(result, Err(SmtpError::Unrecognized)));
    }

    #[test]
    fn test_verbs_case_insensitive() {
        let handler = create_handler();
        let mut session = SmtpSession::new();

        assert_eq!(
            handler.process_command("quit", &mut session).unwrap().code,
            "221"
        );
        assert_eq!(
            handler.process_command("QuIt", &mut session).unwrap().code,
            "221"
        );
    }
}
