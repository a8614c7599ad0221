//! Error types for the SMTP server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command unrecognized")]
    Unrecognized,

    #[error("syntax error in parameters or arguments")]
    BadSyntax,

    #[error("command not implemented")]
    NotImplemented,

    #[error("bad sequence of commands")]
    BadSequence,

    #[error("no such user: {0}")]
    NoSuchUser(String),

    #[error("address did not verify")]
    Unverified,
}

impl SmtpError {
    /// Reply code for the error, or `None` when the session must end.
    pub fn to_reply_code(&self) -> Option<&'static str> {
        match self {
            SmtpError::Io(_) => None,
            SmtpError::Unrecognized => Some("500"),
            SmtpError::BadSyntax => Some("501"),
            SmtpError::NotImplemented => Some("502"),
            SmtpError::BadSequence => Some("503"),
            SmtpError::NoSuchUser(_) | SmtpError::Unverified => Some("550"),
        }
    }

    pub fn to_reply_message(&self) -> String {
        match self {
            SmtpError::Io(_) => "Service not available".to_string(),
            SmtpError::Unrecognized => "Syntax error, command unrecognized".to_string(),
            SmtpError::BadSyntax => "Syntax error in parameters or arguments".to_string(),
            SmtpError::NotImplemented => "Command not implemented".to_string(),
            SmtpError::BadSequence => "Bad sequence of commands".to_string(),
            SmtpError::NoSuchUser(addr) => format!("No such user, {addr}"),
            SmtpError::Unverified => "Did not verify successfully".to_string(),
        }
    }
}
