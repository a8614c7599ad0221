use std::env;
use std::process;
use std::sync::Arc;

use minimail::{MemoryStore, Pop3Server};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Invalid arguments. Expected: {} <port>", args[0]);
        process::exit(1);
    }

    let store = match MemoryStore::from_users_file("users.txt") {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Could not read users.txt: {e}");
            process::exit(1);
        }
    };

    let server = Pop3Server::new("localhost", store);
    if let Err(e) = server.start(&format!("0.0.0.0:{}", args[1])) {
        eprintln!("Server error: {e}");
        process::exit(1);
    }
}
