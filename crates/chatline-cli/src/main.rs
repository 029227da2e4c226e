//! `chatline` - terminal client for JSON chat backends.
//!
//! Plain lines are sent as chat messages; lines starting with `/` are
//! commands (see `/help`). Replies are printed as they arrive, so you can
//! switch threads while a request is still in flight.

use std::path::PathBuf;
use std::sync::Arc;

use chatline_core::event_bus::{ChatEvent, EventBus};
use chatline_core::paths::config_dir;
use chatline_core::profile::{
    load_profile, load_profile_file, save_profile, BackendProfile, Preset, ProfileError,
    DEFAULT_BASE_URL,
};
use chatline_core::{ChatSessionController, SendError, SessionId, TranscriptRenderer, ViewRenderer};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const HELP: &str = "\
Commands:
  /login <email>        log in (clears the current thread)
  /logout               forget user and thread
  /threads              list your threads
  /new                  create a thread and switch to it
  /switch <id>          switch to a thread and load its history
  /rename <id> <name>   rename a thread
  /delete <id>          delete a thread
  /history              reload history for the current thread
  /health               check the backend
  /help                 show this help
  /quit                 exit";

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Terminal client for JSON chat backends", long_about = None)]
struct Cli {
    /// Profile JSON file (defaults to ~/.config/chatline/profile.json)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Built-in profile: basic, user-history, threaded, agent
    #[arg(long)]
    preset: Option<String>,

    /// Override the profile's base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Log in with this email on start
    #[arg(long)]
    email: Option<String>,

    /// Start in this thread and load its history
    #[arg(long)]
    thread: Option<String>,

    /// Write a wire log per session into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Save the resolved profile as the default and exit
    #[arg(long)]
    save_profile: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("chatline: {}", e);
        std::process::exit(1);
    }
}

fn resolve_profile(cli: &Cli) -> Result<BackendProfile, String> {
    let base_url = cli.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);

    let mut profile = if let Some(path) = &cli.profile {
        load_profile_file(path).map_err(|e| e.to_string())?
    } else if let Some(name) = &cli.preset {
        let preset: Preset = name.parse().map_err(|e: ProfileError| e.to_string())?;
        preset.profile(base_url)
    } else {
        match load_profile(&config_dir()?) {
            Ok(profile) => profile,
            Err(ProfileError::NotFound(_)) => {
                log::debug!("No saved profile, using basic preset");
                Preset::Basic.profile(base_url)
            }
            Err(e) => return Err(e.to_string()),
        }
    };

    if let Some(url) = &cli.base_url {
        profile.base_url = url.clone();
    }
    Ok(profile)
}

async fn run(cli: Cli) -> Result<(), String> {
    let profile = resolve_profile(&cli)?;

    if cli.save_profile {
        let dir = config_dir()?;
        save_profile(&dir, &profile).map_err(|e| e.to_string())?;
        println!("Saved profile '{}' to {}", profile.name, dir.display());
        return Ok(());
    }

    log::info!("Using profile '{}' at {}", profile.name, profile.base_url);

    let event_bus = Arc::new(EventBus::new());
    let mut controller = ChatSessionController::with_http(profile).with_event_bus(Arc::clone(&event_bus));
    if let Some(dir) = &cli.log_dir {
        controller = controller.with_log_dir(dir);
    }
    let controller = Arc::new(controller);

    tokio::spawn(print_transcript(Arc::clone(&event_bus)));

    if let Some(email) = &cli.email {
        let user = controller.login(email).await.map_err(|e| e.to_string())?;
        println!("Logged in as {} ({})", user.name, user.user_id);
    }
    if let Some(thread) = &cli.thread {
        controller
            .load_history(SessionId::from(thread.as_str()))
            .await
            .map_err(|e| e.to_string())?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(|e| e.to_string())?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let line = line.trim();
        if let Some(command) = line.strip_prefix('/') {
            if !run_command(&controller, command).await {
                break;
            }
        } else if !line.is_empty() {
            send(&controller, line.to_string());
        }
    }

    Ok(())
}

/// Fire off a chat message; the reply arrives through the event bus.
fn send(controller: &Arc<ChatSessionController>, text: String) {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        match controller.submit(&text).await {
            Ok(_) => {}
            Err(SendError::Superseded) => log::debug!("Reply arrived after switching threads"),
            Err(e) => eprintln!("error: {}", e),
        }
    });
}

/// Returns false when the REPL should exit.
async fn run_command(controller: &ChatSessionController, command: &str) -> bool {
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));

    let result = match name {
        "quit" | "exit" => return false,
        "help" => {
            println!("{HELP}");
            Ok(())
        }
        "login" => controller
            .login(rest)
            .await
            .map(|user| println!("Logged in as {} ({})", user.name, user.user_id)),
        "logout" => {
            controller.logout();
            println!("Logged out");
            Ok(())
        }
        "threads" | "new" if !controller.session().is_logged_in() => {
            println!("Log in first: /login <email>");
            Ok(())
        }
        "threads" => controller.list_threads().await.map(|threads| {
            if threads.is_empty() {
                println!("No threads");
            }
            let active = controller.session().session_id;
            for thread in threads {
                let marker = if Some(&thread.id) == active.as_ref() { "*" } else { " " };
                println!("{} {}  {}", marker, thread.id, thread.name);
            }
        }),
        "new" => controller
            .create_thread()
            .await
            .map(|thread| println!("Created {} ({})", thread.name, thread.id)),
        "switch" | "delete" if rest.is_empty() => {
            println!("usage: /{} <id>", name);
            Ok(())
        }
        "switch" => controller
            .load_history(SessionId::from(rest))
            .await
            .map(|log| println!("Switched to {} ({} messages)", rest, log.len())),
        "rename" => match rest.split_once(char::is_whitespace) {
            Some((id, name)) => controller.rename_thread(&SessionId::from(id), name).await,
            None => {
                println!("usage: /rename <id> <name>");
                Ok(())
            }
        },
        "delete" => controller.delete_thread(&SessionId::from(rest)).await,
        "history" => controller.reload_history().await.map(|_| ()),
        "health" => controller.check_health().await.map(|ok| {
            println!("{}", if ok { "Backend is healthy" } else { "Backend reported a problem" })
        }),
        _ => {
            println!("Unknown command /{}. Try /help", command);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
    }
    true
}

async fn print_transcript(event_bus: Arc<EventBus>) {
    let renderer = TranscriptRenderer::default();
    let mut rx = event_bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(ChatEvent::MessageAppended { message, .. }) => {
                println!("{}", renderer.render_message(&message));
            }
            Ok(ChatEvent::SessionChanged { session }) => {
                log::debug!("Session is now {:?}", session.session_id);
            }
            Ok(ChatEvent::LogCleared) => {}
            Err(RecvError::Lagged(n)) => log::warn!("Transcript skipped {} events", n),
            Err(RecvError::Closed) => break,
        }
    }
}
