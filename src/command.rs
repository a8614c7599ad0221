//! Command tokenization and bounded line reading shared by both servers

use std::io::{self, BufRead, Read};

use thiserror::Error;

/// Maximum number of whitespace-separated tokens in one command line,
/// verb included. More tokens is a syntax error, never truncation.
pub const MAX_TOKENS: usize = 20;

/// Maximum accepted length of one line, excluding the CRLF terminator.
pub const LINE_MAX_LENGTH: usize = 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("too many tokens (max {max})")]
    TooManyTokens { max: usize },
}

/// One tokenized command line: a verb plus its arguments.
///
/// The verb is matched case-insensitively by the dispatchers; argument
/// case is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().ok_or(CommandError::Empty)?.to_owned();
        let args: Vec<String> = tokens.map(str::to_owned).collect();

        if args.len() + 1 > MAX_TOKENS {
            return Err(CommandError::TooManyTokens { max: MAX_TOKENS });
        }

        Ok(Self { verb, args })
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }
}

/// Read one line, stripping a single trailing CRLF (or bare LF).
///
/// Returns `Ok(None)` at end of stream, or when the stream ends in the
/// middle of a line. A line longer than [`LINE_MAX_LENGTH`] is an error;
/// the caller ends the session. Invalid UTF-8 is decoded lossily.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let limit = (LINE_MAX_LENGTH + 2) as u64;
    let mut buf = Vec::new();
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;

    if n == 0 {
        return Ok(None);
    }

    if !buf.ends_with(b"\n") {
        if n as u64 == limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {LINE_MAX_LENGTH} bytes"),
            ));
        }
        // Stream ended mid-line.
        return Ok(None);
    }

    buf.pop();
    if buf.ends_with(b"\r") {
        buf.pop();
    }

    // The budget leaves room for CRLF; a bare-LF line can still come in
    // one byte over, so the bound is re-checked on the stripped line.
    if buf.len() > LINE_MAX_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {LINE_MAX_LENGTH} bytes"),
        ));
    }

    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
