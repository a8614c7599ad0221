//! POP3 reply formatting

/// One POP3 reply.
///
/// Multi-line replies carry a `+OK` status line, payload lines, and the
/// lone-dot terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop3Reply {
    Ok(String),
    Err(String),
    MultiLine { status: String, lines: Vec<String> },
}

impl Pop3Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::Ok(message.into())
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self::Err(message.into())
    }

    pub fn multi_line(status: impl Into<String>, lines: Vec<String>) -> Self {
        Self::MultiLine {
            status: status.into(),
            lines,
        }
    }

    /// The `+OK <count> <octets>` form shared by STAT and LIST-with-arg.
    pub fn stat(count: usize, octets: usize) -> Self {
        Self::Ok(format!("{count} {octets}"))
    }

    /// Render the reply for the wire, CRLF terminated.
    pub fn format(&self) -> String {
        match self {
            Self::Ok(message) => format!("+OK {message}\r\n"),
            Self::Err(message) => format!("-ERR {message}\r\n"),
            Self::MultiLine { status, lines } => {
                let mut out = format!("+OK {status}\r\n");
                for line in lines {
                    out.push_str(line);
                    out.push_str("\r\n");
                }
                out.push_str(".\r\n");
                out
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Err(_))
    }
}
