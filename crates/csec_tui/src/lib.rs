//! Terminal frontend for the CSEC assistant: a line-oriented loop over
//! the command layer (auth, documents, chat history, live chat).

pub mod commands;

use std::io::{self, BufRead, Write};

use commands::App;

type InputLines = io::Lines<io::StdinLock<'static>>;

const HELP: &str = "\
Commands:
  /login <username>              log in (password on the next line)
  /register <email> <username>   create an account (password on the next line)
  /logout                        drop stored credentials
  /connect                       (re)connect the chat stream
  /status                        show connection state
  /docs                          list documents
  /upload <title> <path>         upload a PDF
  /delete <id>                   delete a document
  /history                       list past chat sessions
  /session <id>                  show one session's messages
  /quit                          exit
Anything else is sent to the assistant.";

pub fn run() {
    // Optional config path as the first argument; otherwise the
    // CSEC_CONFIG env var or the default location.
    let override_path = std::env::args().nth(1);
    let config_path = match commands::resolve_config_path(override_path.as_deref()) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    let mut app = match App::from_config_path(&config_path) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            std::process::exit(1);
        });

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    rt.block_on(async {
        let status = app.connect().await;
        println!("CSEC assistant ({})", app.config().api_base_url());
        println!("Connection: {}", status.state);
        println!("{}", HELP);

        loop {
            print!("> ");
            let _ = io::stdout().flush();
            let Some(Ok(line)) = lines.next() else { break };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            if !handle_line(&mut app, &line, &mut lines).await {
                break;
            }
        }
        app.disconnect().await;
    });
}

/// Handle one input line. Returns false when the loop should exit.
async fn handle_line(app: &mut App, line: &str, lines: &mut InputLines) -> bool {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return true;
    };
    match head {
        "/quit" | "/exit" => return false,
        "/help" => println!("{}", HELP),
        "/login" => {
            let Some(username) = parts.next() else {
                println!("usage: /login <username>");
                return true;
            };
            let Some(password) = prompt_password(lines) else {
                return false;
            };
            match app.login(username, &password).await {
                Ok(()) => println!("Logged in as {}.", username),
                Err(err) => println!("Login failed: {}", err),
            }
        }
        "/register" => {
            let (Some(email), Some(username)) = (parts.next(), parts.next()) else {
                println!("usage: /register <email> <username>");
                return true;
            };
            let Some(password) = prompt_password(lines) else {
                return false;
            };
            match app.register(email, username, &password).await {
                Ok(()) => println!("Account created. Use /login to sign in."),
                Err(err) => println!("Registration failed: {}", err),
            }
        }
        "/logout" => match app.logout() {
            Ok(()) => println!("Logged out."),
            Err(err) => println!("Logout failed: {}", err),
        },
        "/connect" => {
            let status = app.connect().await;
            match status.message {
                Some(message) => println!("Connection: {} ({})", status.state, message),
                None => println!("Connection: {}", status.state),
            }
        }
        "/status" => {
            let status = app.connection_status();
            let auth = if app.is_authenticated() {
                "logged in"
            } else {
                "logged out"
            };
            println!("Connection: {} ({})", status.state, auth);
        }
        "/docs" => match app.list_documents().await {
            Ok(docs) if docs.is_empty() => println!("No documents."),
            Ok(docs) => {
                for doc in docs {
                    let state = if doc.processed { "processed" } else { "pending" };
                    println!("#{}  {}  ({})", doc.id, doc.title, state);
                }
            }
            Err(err) => println!("Error: {}", err),
        },
        "/upload" => {
            let (Some(title), Some(path)) = (parts.next(), parts.next()) else {
                println!("usage: /upload <title> <path>");
                return true;
            };
            match app.upload_document(title, std::path::Path::new(path)).await {
                Ok(doc) => println!("Uploaded #{} {}.", doc.id, doc.title),
                Err(err) => println!("Upload failed: {}", err),
            }
        }
        "/delete" => {
            let Some(id) = parts.next().and_then(|s| s.parse::<i64>().ok()) else {
                println!("usage: /delete <id>");
                return true;
            };
            match app.delete_document(id).await {
                Ok(()) => println!("Deleted."),
                Err(err) => println!("Delete failed: {}", err),
            }
        }
        "/history" => match app.list_sessions().await {
            Ok(sessions) if sessions.is_empty() => println!("No chat sessions."),
            Ok(sessions) => {
                for session in sessions {
                    let preview = session
                        .last_message
                        .map(|m| truncated(&m.content))
                        .unwrap_or_default();
                    println!("#{}  {}  {}", session.id, session.created_at, preview);
                }
            }
            Err(err) => println!("Error: {}", err),
        },
        "/session" => {
            let Some(id) = parts.next().and_then(|s| s.parse::<i64>().ok()) else {
                println!("usage: /session <id>");
                return true;
            };
            match app.session_detail(id).await {
                Ok(detail) => {
                    for message in detail.messages {
                        println!("{}: {}", message.role, message.content);
                    }
                }
                Err(err) => println!("Error: {}", err),
            }
        }
        _ => match app.send_message(line).await {
            Ok(reply) => {
                if let Some(err) = reply.error {
                    println!("[{}]", err);
                }
                if !reply.answer.is_empty() {
                    println!("{}", reply.answer);
                }
            }
            Err(err) => println!("Error: {}", err),
        },
    }
    true
}

/// Read the password from the next input line. None means EOF.
fn prompt_password(lines: &mut InputLines) -> Option<String> {
    println!("password:");
    let line = lines.next()?.ok()?;
    Some(line.trim().to_string())
}

fn truncated(content: &str) -> String {
    let mut preview: String = content.chars().take(60).collect();
    if preview.len() < content.len() {
        preview.push('…');
    }
    preview
}
