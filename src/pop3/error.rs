//! Error types for the POP3 server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Pop3Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid syntax or order of commands")]
    BadCommand,

    #[error("command unrecognized")]
    Unrecognized,

    #[error("user does not exist")]
    NoSuchUser,

    #[error("invalid password")]
    InvalidPassword,

    #[error("invalid argument for {0}")]
    InvalidArgument(&'static str),

    #[error("no such message or message already deleted")]
    NoSuchMessage,
}

impl Pop3Error {
    /// Text for the `-ERR` reply, or `None` when the session must end.
    pub fn to_reply_message(&self) -> Option<String> {
        match self {
            Pop3Error::Io(_) => None,
            Pop3Error::BadCommand => Some("Invalid syntax or order of commands".to_string()),
            Pop3Error::Unrecognized => Some("Command unrecognized".to_string()),
            Pop3Error::NoSuchUser => Some("User does not exist".to_string()),
            Pop3Error::InvalidPassword => Some("Invalid password".to_string()),
            Pop3Error::InvalidArgument(verb) => Some(format!("Invalid argument for {verb}")),
            Pop3Error::NoSuchMessage => {
                Some("The position is invalid or the message is marked as deleted".to_string())
            }
        }
    }
}
