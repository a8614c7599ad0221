//! # Minimail
//!
//! Minimail is a pair of minimal, line-oriented mail servers: a POP3
//! server for mailbox retrieval and an SMTP server for mail submission.
//! Both drive one connection through a strict command/reply state
//! machine and share a pluggable mail store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minimail::{MemoryStore, Pop3Server, SmtpServer};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let store = Arc::new(MemoryStore::new());
//! store.add_user("alice@example.com", "secret");
//!
//! // Submission and retrieval share the same store.
//! let smtp = SmtpServer::new("mail.example.com", store.clone());
//! let pop3 = Pop3Server::new("mail.example.com", store);
//!
//! thread::spawn(move || smtp.start("127.0.0.1:2525").unwrap());
//! pop3.start("127.0.0.1:2110").unwrap();
//! ```
//!
//! ## Supported POP3 commands
//!
//! - `USER` / `PASS` - Authenticate and load the mailbox
//! - `STAT` - Message count and total octets
//! - `LIST` - Listing of all messages, or the size of one
//! - `RETR` - Retrieve one message
//! - `DELE` / `RSET` - Mark one message deleted / restore all
//! - `NOOP` - Do nothing
//! - `QUIT` - Purge deleted messages and close
//!
//! ## Supported SMTP commands
//!
//! - `EHLO` / `HELO` - Identify the client
//! - `MAIL FROM` - Open an envelope
//! - `RCPT TO` - Add a verified recipient (multiple allowed)
//! - `DATA` - Send the message body, dot-stuffed, ending with `.`
//! - `RSET` / `NOOP` / `VRFY` / `QUIT`
//!
//! ## Notes
//!
//! - One thread per connection; sessions share only the mail store.
//! - Credentials travel in cleartext, as the protocols define.
//! - SSL/TLS and command pipelining are not supported.
//! - `MemoryStore` keeps mailboxes in memory only.

mod command;
pub mod pop3;
pub mod smtp;
pub mod store;

pub use pop3::{Pop3Error, Pop3Reply, Pop3Server, Pop3Session, Pop3State};
pub use smtp::{SmtpError, SmtpMode, SmtpResponse, SmtpServer, SmtpSession};
pub use store::{MailItem, MailList, MailStore, MemoryStore};
