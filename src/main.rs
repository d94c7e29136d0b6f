//! gatepass operator CLI.
//!
//! Subcommands:
//! - `keygen`: print a fresh random signing key for `SESSION_KEY`
//! - `hash-password <password>`: print an Argon2id PHC hash
//! - `check`: load configuration, build the configured session store and
//!   run a begin / get_state / end probe against it

use gatepass::{
    auth::{generate_signing_key, password, AppState},
    config::Config,
    models::{unix_now, SessionState, User},
};

fn print_usage() {
    eprintln!("Usage: gatepass <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  keygen                    Generate a signing key for SESSION_KEY");
    eprintln!("  hash-password <password>  Hash a password with Argon2id");
    eprintln!("  check                     Probe the configured session store");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  gatepass keygen");
    eprintln!();
    eprintln!("Then set in .env:");
    eprintln!("  SESSION_KEY=<output>");
}

/// Begin, read back and end a throwaway session.
async fn check() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| format!("Failed to load config: {}", e))?;
    tracing::info!(
        backend = ?config.store_backend,
        ttl_secs = config.session_ttl_secs,
        "Checking session store"
    );

    let state = AppState::from_config(config).map_err(|e| format!("Setup failed: {}", e))?;

    let probe = User {
        id: format!("probe-{}", unix_now()),
        email: "probe@gatepass.invalid".to_string(),
        pass_hash: String::new(),
        user_name: "probe".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        photo_url: String::new(),
        mobile_phone: String::new(),
    };

    let id = state
        .sessions
        .begin(SessionState::new(probe.clone(), "127.0.0.1"))
        .await
        .map_err(|e| format!("begin failed: {}", e))?;

    let (_, session) = state
        .sessions
        .get_state(id.as_str())
        .await
        .map_err(|e| format!("get_state failed: {}", e))?;
    if session.user.id != probe.id {
        return Err("get_state returned a different session".to_string());
    }

    state
        .sessions
        .end(&id)
        .await
        .map_err(|e| format!("end failed: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("keygen") if args.len() == 2 => match generate_signing_key() {
            Ok(key) => println!("{}", key),
            Err(e) => {
                eprintln!("Error generating key: {}", e);
                std::process::exit(1);
            }
        },
        Some("hash-password") if args.len() == 3 => match password::hash_password(&args[2]) {
            Ok(hash) => println!("{}", hash),
            Err(e) => {
                eprintln!("Error hashing password: {}", e);
                std::process::exit(1);
            }
        },
        Some("check") if args.len() == 2 => match check().await {
            Ok(()) => println!("ok"),
            Err(e) => {
                eprintln!("Session store check failed: {}", e);
                std::process::exit(1);
            }
        },
        _ => {
            print_usage();
            std::process::exit(1);
        }
    }
}
