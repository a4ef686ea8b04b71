use clap::Parser;
use roomsync::clients::CompileClient;
use roomsync::models::compile::{CompileRequest, Language};
use roomsync::session::{RoomSession, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

/// Plain lines are appended to the shared document. Commands:
/// `/who`, `/show`, `/run <lang> [input]`, `/leave`.
#[derive(Debug, Parser)]
#[command(name = "roomsync-client", about = "Join a roomsync room from the terminal")]
struct Args {
    /// Coordinator websocket URL.
    #[arg(long, env = "ROOMSYNC_URL", default_value = "ws://127.0.0.1:5000/ws")]
    url: String,

    /// Room to join. A fresh room id is generated when omitted.
    #[arg(long)]
    room: Option<String>,

    /// Display name shown to the rest of the room.
    #[arg(long, env = "ROOMSYNC_NAME")]
    name: String,

    /// Compile-and-run endpoint used by `/run`.
    #[arg(long, env = "ROOMSYNC_COMPILE_URL")]
    compile_url: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let room = args.room.unwrap_or_else(|| Uuid::new_v4().to_string());

    let compile = match args.compile_url.as_deref().map(CompileClient::new) {
        Some(Ok(client)) => Some(client),
        Some(Err(e)) => {
            warn!("Compile client unavailable: {}", e);
            None
        }
        None => None,
    };

    let (session, mut events) = match RoomSession::join(&args.url, room.clone(), args.name.clone()).await {
        Ok(joined) => joined,
        Err(e) => {
            eprintln!("{}", e.notification());
            error!("Could not join room {}: {}", room, e);
            std::process::exit(1);
        }
    };
    println!("Joined room {} as {}", room, args.name);

    let mut presence: Vec<String> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(SessionEvent::Notification(n)) => println!("* {}", n),
                    Some(SessionEvent::PresenceChanged(members)) => {
                        presence = members.into_iter().map(|m| m.display_name).collect();
                    }
                    Some(SessionEvent::RemoteChange(code)) => {
                        println!("--- document updated ---\n{}\n------------------------", code);
                    }
                    Some(SessionEvent::Closed(reason)) => {
                        eprintln!("Session closed: {:?}", reason);
                        std::process::exit(1);
                    }
                    None => break,
                }
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                match line.trim() {
                    "/leave" => break,
                    "/who" => println!("Connected: {}", presence.join(", ")),
                    "/show" => println!("{}", session.document().unwrap_or_default()),
                    cmd if cmd.starts_with("/run") => {
                        let Some(client) = compile.as_ref() else {
                            println!("No compile endpoint configured (--compile-url)");
                            continue;
                        };
                        let mut parts = cmd.splitn(3, ' ').skip(1);
                        let lang = match parts.next().unwrap_or("cpp17").parse::<Language>() {
                            Ok(lang) => lang,
                            Err(e) => {
                                println!("{}", e);
                                continue;
                            }
                        };
                        let request = CompileRequest {
                            code: session.document().unwrap_or_default(),
                            input: parts.next().unwrap_or_default().to_string(),
                            lang,
                        };
                        // Failures are already logged by the client.
                        if let Ok(response) = client.run(&request).await {
                            println!("{}", response.output);
                        }
                    }
                    _ => {
                        let mut text = session.document().unwrap_or_default();
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&line);
                        if session.edit(text).is_err() {
                            eprintln!("Session is closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    session.leave().await;
}
