//! csec-chat: one-shot CLI for the CSEC assistant.
//! `csec-chat login <username>` reads a password from stdin and stores
//! the credential pair, `csec-chat logout` clears it, and
//! `csec-chat [message]` streams a single assistant reply to stdout
//! (message from the arguments, or from stdin when absent).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use csec_client::chat::{ChatEvent, Status};
use csec_client::{config, ApiClient, ChatClient, TokenStore};

fn resolve_config_path() -> PathBuf {
    // 1. --config <path> flag
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if let Some(path) = args.get(pos + 1) {
            return PathBuf::from(path);
        }
    }
    // 2. CSEC_CONFIG env var
    if let Ok(val) = std::env::var("CSEC_CONFIG") {
        return PathBuf::from(val);
    }
    // 3. Default path (~/.csec/config.yaml)
    config::default_config_path().unwrap_or_else(|| {
        eprintln!("Error: unable to determine config path (set --config or CSEC_CONFIG)");
        process::exit(1);
    })
}

/// Positional arguments with the `--config <path>` pair removed.
fn positional_args() -> Vec<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut rest = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            i += 2;
            continue;
        }
        rest.push(args[i].clone());
        i += 1;
    }
    rest
}

fn read_stdin_line() -> String {
    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).unwrap_or(0);
    line.trim().to_string()
}

fn main() {
    tracing_subscriber::fmt::init();

    let config_path = resolve_config_path();

    let cfg = match config::load_or_default(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Error: failed to load config from {}: {}",
                config_path.display(),
                e
            );
            process::exit(1);
        }
    };

    let store = Arc::new(TokenStore::open(cfg.tokens_path(&config_path)));

    // Run on a tokio runtime.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let rest = positional_args();
    match rest.first().map(String::as_str) {
        Some("login") => {
            let Some(username) = rest.get(1) else {
                eprintln!("Usage: csec-chat login <username>");
                process::exit(1);
            };
            let password = read_stdin_line();
            if password.is_empty() {
                eprintln!("Error: no password provided on stdin");
                process::exit(1);
            }
            let api = ApiClient::new(cfg.api_base_url(), store);
            rt.block_on(async {
                match api.login(username, &password).await {
                    Ok(()) => println!("Logged in as {}.", username),
                    Err(e) => {
                        eprintln!("Error: login failed: {}", e);
                        process::exit(1);
                    }
                }
            });
        }
        Some("logout") => {
            let api = ApiClient::new(cfg.api_base_url(), store);
            match api.logout() {
                Ok(()) => println!("Logged out."),
                Err(e) => {
                    eprintln!("Error: logout failed: {}", e);
                    process::exit(1);
                }
            }
        }
        _ => {
            // Message from the arguments, or the first stdin line.
            let message = if rest.is_empty() {
                read_stdin_line()
            } else {
                rest.join(" ")
            };
            if message.is_empty() {
                eprintln!("Error: no message provided");
                process::exit(1);
            }
            rt.block_on(run_chat(cfg.chat_url(), store, message));
        }
    }
}

async fn run_chat(chat_url: String, store: Arc<TokenStore>, message: String) {
    let mut chat = ChatClient::new(chat_url, store);
    chat.open().await;
    match chat.next_event().await {
        Some(ChatEvent::Status(Status::Connected)) => {}
        _ => {
            eprintln!("Error: connection failed");
            process::exit(1);
        }
    }

    chat.send(&message).await;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    while let Some(event) = chat.next_event().await {
        match event {
            ChatEvent::Delta(chunk) => {
                let _ = write!(out, "{}", chunk);
                let _ = out.flush();
            }
            ChatEvent::Done => {
                // Newline after the answer text.
                let _ = writeln!(out);
                break;
            }
            ChatEvent::Status(Status::StreamError(msg)) => {
                eprintln!("Server error: {}", msg);
                process::exit(1);
            }
            ChatEvent::Status(Status::Disconnected) => {
                eprintln!("Error: disconnected before the reply completed");
                process::exit(1);
            }
            ChatEvent::Session(_) | ChatEvent::Status(_) => {}
        }
    }

    chat.close().await;
}
