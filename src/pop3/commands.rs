//! Implementation of POP3 commands

use std::sync::Arc;

use crate::command::{Command, CommandError};
use crate::pop3::error::Pop3Error;
use crate::pop3::response::Pop3Reply;
use crate::pop3::session::{Pop3Session, Pop3State};
use crate::store::MailStore;

/// Known POP3 verbs, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pop3Verb {
    User,
    Pass,
    Stat,
    List,
    Dele,
    Rset,
    Retr,
    Noop,
    Quit,
}

const VERBS: &[(&str, Pop3Verb)] = &[
    ("USER", Pop3Verb::User),
    ("PASS", Pop3Verb::Pass),
    ("STAT", Pop3Verb::Stat),
    ("LIST", Pop3Verb::List),
    ("DELE", Pop3Verb::Dele),
    ("RSET", Pop3Verb::Rset),
    ("RETR", Pop3Verb::Retr),
    ("NOOP", Pop3Verb::Noop),
    ("QUIT", Pop3Verb::Quit),
];

impl Pop3Verb {
    fn lookup(verb: &str) -> Option<Self> {
        VERBS
            .iter()
            .find(|(name, _)| verb.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
    }
}

/// Handles POP3 commands and returns appropriate replies
pub struct Pop3CommandHandler {
    hostname: String,
    store: Arc<dyn MailStore>,
}

impl Pop3CommandHandler {
    pub fn new(hostname: &str, store: Arc<dyn MailStore>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            store,
        }
    }

    pub fn greeting(&self) -> Pop3Reply {
        Pop3Reply::ok(format!("{} POP3 server ready", self.hostname))
    }

    /// Process one command line and return a reply.
    ///
    /// Errors other than I/O map to `-ERR` replies; the session continues.
    pub fn process_command(
        &self,
        line: &str,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Err(Pop3Error::Unrecognized),
            Err(CommandError::TooManyTokens { .. }) => return Err(Pop3Error::BadCommand),
        };

        let result = match Pop3Verb::lookup(&command.verb) {
            Some(Pop3Verb::User) => self.handle_user(&command, session),
            Some(Pop3Verb::Pass) => self.handle_pass(&command, session),
            Some(Pop3Verb::Stat) => self.handle_stat(&command, session),
            Some(Pop3Verb::List) => self.handle_list(&command, session),
            Some(Pop3Verb::Dele) => self.handle_dele(&command, session),
            Some(Pop3Verb::Rset) => self.handle_rset(&command, session),
            Some(Pop3Verb::Retr) => self.handle_retr(&command, session),
            Some(Pop3Verb::Noop) => self.handle_noop(&command, session),
            Some(Pop3Verb::Quit) => self.handle_quit(&command, session),
            None => Err(Pop3Error::Unrecognized),
        };

        // The verb of this line becomes the history for the next one,
        // whether or not the command was accepted.
        session.record_verb(&command.verb);

        result
    }

    fn handle_user(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 1 || session.state != Pop3State::Authorization {
            return Err(Pop3Error::BadCommand);
        }

        let name = &command.args[0];
        if self.store.user_exists(name) {
            session.pending_user = Some(name.clone());
            Ok(Pop3Reply::ok(format!("{name} is a valid mailbox")))
        } else {
            session.pending_user = None;
            Err(Pop3Error::NoSuchUser)
        }
    }

    fn handle_pass(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 1 || !session.pass_allowed() {
            return Err(Pop3Error::BadCommand);
        }
        let Some(user) = session.pending_user.clone() else {
            return Err(Pop3Error::BadCommand);
        };

        if self.store.verify_credentials(&user, &command.args[0]) {
            let list = self.store.load_mail_list(&user);
            session.enter_transaction(list);
            Ok(Pop3Reply::ok("mailbox ready"))
        } else {
            Err(Pop3Error::InvalidPassword)
        }
    }

    fn handle_stat(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 0 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        let Some(list) = session.mail_list.as_ref() else {
            return Err(Pop3Error::BadCommand);
        };

        Ok(Pop3Reply::stat(list.count(false), list.octets()))
    }

    fn handle_list(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() > 1 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        let Some(list) = session.mail_list.as_ref() else {
            return Err(Pop3Error::BadCommand);
        };

        if command.arg_count() == 0 {
            let status = format!("{} messages ({} octets)", list.count(false), list.octets());
            let mut lines = Vec::new();
            for index in 0..list.count(true) {
                if let Some(item) = list.item(index) {
                    lines.push(format!("{} {}", index + 1, item.size()));
                }
            }
            return Ok(Pop3Reply::multi_line(status, lines));
        }

        let index = parse_position(&command.args[0]).ok_or(Pop3Error::InvalidArgument("LIST"))?;
        let item = list.item(index).ok_or(Pop3Error::NoSuchMessage)?;
        Ok(Pop3Reply::stat(index + 1, item.size()))
    }

    fn handle_dele(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 1 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        let Some(list) = session.mail_list.as_mut() else {
            return Err(Pop3Error::BadCommand);
        };

        let index = parse_position(&command.args[0]).ok_or(Pop3Error::InvalidArgument("DELE"))?;
        if list.mark_deleted(index) {
            Ok(Pop3Reply::ok(format!("message {} deleted", index + 1)))
        } else {
            Err(Pop3Error::NoSuchMessage)
        }
    }

    fn handle_rset(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 0 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        let Some(list) = session.mail_list.as_mut() else {
            return Err(Pop3Error::BadCommand);
        };

        let restored = list.reset_deleted();
        Ok(Pop3Reply::ok(format!("{restored} messages restored")))
    }

    /// Streams the stored content verbatim, with no output byte-stuffing:
    /// a stored line consisting of a single dot reads back as the reply
    /// terminator.
    fn handle_retr(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 1 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        let Some(list) = session.mail_list.as_ref() else {
            return Err(Pop3Error::BadCommand);
        };

        let index = parse_position(&command.args[0]).ok_or(Pop3Error::InvalidArgument("RETR"))?;
        let item = list.item(index).ok_or(Pop3Error::NoSuchMessage)?;

        let status = format!("{} octets", item.size());
        let lines = item.content().lines().map(str::to_owned).collect();
        Ok(Pop3Reply::multi_line(status, lines))
    }

    fn handle_noop(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 0 || session.state != Pop3State::Transaction {
            return Err(Pop3Error::BadCommand);
        }
        Ok(Pop3Reply::ok(""))
    }

    fn handle_quit(
        &self,
        command: &Command,
        session: &mut Pop3Session,
    ) -> Result<Pop3Reply, Pop3Error> {
        if command.arg_count() != 0 {
            return Err(Pop3Error::BadCommand);
        }

        match session.state {
            Pop3State::Authorization => {
                session.closed = true;
                Ok(Pop3Reply::ok("POP3 server signing off"))
            }
            Pop3State::Transaction => {
                let Some(list) = session.mail_list.take() else {
                    return Err(Pop3Error::BadCommand);
                };
                let failed = self.store.purge_deleted(&list);
                session.state = Pop3State::Update;
                session.closed = true;
                if failed > 0 {
                    Ok(Pop3Reply::err(format!(
                        "{failed} deleted messages not removed"
                    )))
                } else {
                    Ok(Pop3Reply::ok("POP3 server signing off"))
                }
            }
            Pop3State::Update => Err(Pop3Error::BadCommand),
        }
    }
}

/// Parse a 1-based wire position into a 0-based index. Rejects anything
/// non-numeric and the value 0.
fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok().filter(|&pos| pos > 0).map(|pos| pos - 1)
}
