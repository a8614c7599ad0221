//! POP3 server implementation

use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info};

use crate::command::read_line;
use crate::pop3::commands::Pop3CommandHandler;
use crate::pop3::error::Pop3Error;
use crate::pop3::response::Pop3Reply;
use crate::pop3::session::Pop3Session;
use crate::store::MailStore;

/// POP3 server: accepts connections and runs one session per client.
#[derive(Clone)]
pub struct Pop3Server {
    hostname: String,
    store: Arc<dyn MailStore>,
}

impl Pop3Server {
    pub fn new(hostname: &str, store: Arc<dyn MailStore>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            store,
        }
    }

    /// Bind the address and serve until the process ends (blocking).
    pub fn start(&self, addr: &str) -> Result<(), Pop3Error> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Serve on an existing listener (blocking).
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), Pop3Error> {
        info!("POP3 server listening on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        if let Err(e) = server.handle_client(stream) {
                            error!("error handling POP3 client: {e}");
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

    /// Run one session: read a line, dispatch, reply, until QUIT or EOF.
    fn handle_client(&self, mut stream: TcpStream) -> Result<(), Pop3Error> {
        let handler = Pop3CommandHandler::new(&self.hostname, Arc::clone(&self.store));
        let mut session = Pop3Session::new();
        let mut reader = BufReader::new(stream.try_clone()?);

        self.send_reply(&mut stream, &handler.greeting())?;

        while let Some(line) = read_line(&mut reader)? {
            debug!("POP3 <- {line}");
            match handler.process_command(&line, &mut session) {
                Ok(reply) => {
                    self.send_reply(&mut stream, &reply)?;
                    if session.closed {
                        break;
                    }
                }
                Err(e) => match e.to_reply_message() {
                    Some(message) => {
                        self.send_reply(&mut stream, &Pop3Reply::err(message))?;
                    }
                    None => return Err(e),
                },
            }
        }

        Ok(())
    }

    fn send_reply(&self, stream: &mut TcpStream, reply: &Pop3Reply) -> Result<(), Pop3Error> {
        stream.write_all(reply.format().as_bytes())?;
        stream.flush()?;
        Ok(())
    }
}
