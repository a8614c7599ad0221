//! SMTP server implementation

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info};

use crate::command::read_line;
use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{SmtpMode, SmtpSession};
use crate::store::MailStore;

/// SMTP server: accepts connections and runs one session per client.
#[derive(Clone)]
pub struct SmtpServer {
    hostname: String,
    store: Arc<dyn MailStore>,
}

impl SmtpServer {
    pub fn new(hostname: &str, store: Arc<dyn MailStore>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            store,
        }
    }

    /// Bind the address and serve until the process ends (blocking).
    pub fn start(&self, addr: &str) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Serve on an existing listener (blocking).
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!("SMTP server listening on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        if let Err(e) = server.handle_client(stream) {
                            error!("error handling SMTP client: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    /// Run one session. In body mode every line is content until the
    /// lone-dot terminator; otherwise lines are commands.
    fn handle_client(&self, mut stream: TcpStream) -> Result<(), SmtpError> {
        let handler = SmtpCommandHandler::new(&self.hostname, Arc::clone(&self.store));
        let mut session = SmtpSession::new();
        let mut reader = BufReader::new(stream.try_clone()?);

        self.send_response(&mut stream, &SmtpResponse::greeting(&self.hostname))?;

        while let Some(line) = read_line(&mut reader)? {
            if session.mode == SmtpMode::ReadingBody {
                if line == "." {
                    let body = session.take_body();
                    self.store.deliver(&body, &session.recipients);
                    // The envelope stays open for a follow-up DATA.
                    self.send_response(&mut stream, &SmtpResponse::ok())?;
                } else {
                    session.push_body_line(&line);
                }
                continue;
            }

            debug!("SMTP <- {line}");
            match handler.process_command(&line, &mut session) {
                Ok(response) => {
                    self.send_response(&mut stream, &response)?;
                    if response.code == "221" {
                        break; // QUIT
                    }
                }
                Err(e) => match e.to_reply_code() {
                    Some(code) => {
                        let response = SmtpResponse::error(code, &e.to_reply_message());
                        self.send_response(&mut stream, &response)?;
                    }
                    None => return Err(e),
                },
            }
        }

        Ok(())
    }

    fn send_response(
        &self,
        stream: &mut TcpStream,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        stream.write_all(response.format().as_bytes())?;
        stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::BufRead;

    fn start_test_server() -> (String, Arc<MemoryStore>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let store = Arc::new(MemoryStore::new());
        store.add_user("recipient@example.com", "pw");
        let server = SmtpServer::new("test.local", store.clone());

        thread::spawn(move || {
            if let Err(e) = server.start_with_listener(listener) {
                eprintln!("Error starting server: {e}");
            }
        });

        (addr, store)
    }

    fn send_command(stream: &mut TcpStream, command: &str) -> Result<String, std::io::Error> {
        writeln!(stream, "{command}")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        reader.read_line(&mut response)?;
        Ok(response.trim().to_string())
    }

    #[test]
    fn test_complete_smtp_session() {
        let (addr, store) = start_test_server();

        let mut stream = TcpStream::connect(&addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();
        assert!(greeting.starts_with("220"));

        let response = send_command(&mut stream, "EHLO client.local").unwrap();
        assert!(response.starts_with("250"));

        let response = send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap();
        assert!(response.starts_with("250"));

        let response = send_command(&mut stream, "RCPT TO:<recipient@example.com>").unwrap();
        assert!(response.starts_with("250"));

        let response = send_command(&mut stream, "DATA").unwrap();
        assert!(response.starts_with("354"));

        writeln!(stream, "Subject: Test Email").unwrap();
        writeln!(stream).unwrap();
        writeln!(stream, "This is a test email.").unwrap();
        writeln!(stream, ".").unwrap();
        stream.flush().unwrap();

        let mut final_response = String::new();
        reader.read_line(&mut final_response).unwrap();
        assert!(final_response.starts_with("250"));

        let response = send_command(&mut stream, "QUIT").unwrap();
        assert!(response.starts_with("221"));

        assert_eq!(store.message_count("recipient@example.com"), 1);
        let delivered = &store.messages("recipient@example.com")[0];
        assert!(delivered.contains("Subject: Test Email"));
        assert!(delivered.contains("This is a test email."));
    }

    #[test]
    fn test_error_handling() {
        let (addr, _store) = start_test_server();

        let mut stream = TcpStream::connect(&addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();

        let response = send_command(&mut stream, "INVALID").unwrap();
        assert!(response.starts_with("500"));

        // MAIL without EHLO.
        let response = send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap();
        assert!(response.starts_with("503"));

        let response = send_command(&mut stream, "QUIT").unwrap();
        assert!(response.starts_with("221"));
    }

    #[test]
    fn test_premature_eof_in_data_aborts_delivery() {
        let (addr, store) = start_test_server();

        let mut stream = TcpStream::connect(&addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();

        send_command(&mut stream, "EHLO client.local").unwrap();
        send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap();
        send_command(&mut stream, "RCPT TO:<recipient@example.com>").unwrap();
        send_command(&mut stream, "DATA").unwrap();

        writeln!(stream, "half a message").unwrap();
        stream.flush().unwrap();
        drop(stream);

        // Give the session thread time to observe the closed stream.
        thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(store.message_count("recipient@example.com"), 0);
    }
}
