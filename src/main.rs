//! feedly -- command-line driver for the Feedly cloud API client.
//!
//! Loads configuration, installs logging, and runs one command against the
//! API. The first command that needs a token opens the browser for consent;
//! later runs reuse the persisted token file.

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use feedly::api::UnreadCountOptions;
use feedly::config::Config;
use feedly::FeedlyClient;

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Login,
    Logout,
    Token,
    Status,
    Profile,
    Unread,
    Categories,
    Subscriptions,
}

impl Command {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "login" => Self::Login,
            "logout" => Self::Logout,
            "token" => Self::Token,
            "status" => Self::Status,
            "profile" => Self::Profile,
            "unread" => Self::Unread,
            "categories" => Self::Categories,
            "subscriptions" => Self::Subscriptions,
            _ => return None,
        })
    }
}

struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = None;
    let mut command = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("feedly {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => match Command::parse(other) {
                Some(c) if command.is_none() => command = Some(c),
                _ => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Run with --help for usage information.");
                    std::process::exit(1);
                }
            },
        }
    }

    let Some(command) = command else {
        print_usage();
        std::process::exit(1);
    };

    CliArgs {
        config_path,
        command,
    }
}

fn print_usage() {
    println!(
        "\
feedly {version} -- Feedly cloud API client

USAGE:
    feedly [OPTIONS] <COMMAND>

COMMANDS:
    login            Run the browser authorization and store the tokens
    logout           Revoke the refresh token and clear stored tokens
    token            Print a valid access token (refreshing if needed)
    status           Show the stored token state
    profile          Print the user's profile
    unread           Print unread counts
    categories       List categories
    subscriptions    List subscriptions

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: feedly.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    FEEDLY_CONFIG          Alternative to --config flag
    FEEDLY_CLIENT_ID       OAuth client id
    FEEDLY_CLIENT_SECRET   OAuth client secret
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?
        .block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let cli = parse_args();

    // --config wins over FEEDLY_CONFIG
    let config_path = cli
        .config_path
        .or_else(|| std::env::var("FEEDLY_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("feedly.toml"));

    let config = Config::load(&config_path)?;
    init_tracing(&config);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        overrides = config.env_overrides.all().len(),
        "Configuration loaded"
    );

    let client = FeedlyClient::new(config.client).context("Invalid client configuration")?;
    run(&client, cli.command).await
}

async fn run(client: &FeedlyClient, command: Command) -> anyhow::Result<()> {
    let auth = client.auth();
    match command {
        Command::Login => {
            auth.authorize().await?;
            let user = auth.user_id().await.unwrap_or_else(|| "unknown user".into());
            println!("Logged in as {user}");
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out");
        }
        Command::Token => println!("{}", auth.valid_access_token().await?),
        Command::Status => {
            let credentials = auth.credentials().await;
            let status = Status {
                state: auth.state().await.to_string(),
                user_id: credentials.user_id.clone(),
                expires_at: credentials.expires_at.map(|t| t.to_rfc3339()),
                expires_in_secs: credentials.expires_in(chrono::Utc::now()).map(|d| d.as_secs()),
                token_file: auth.store().path().map(|p| p.display().to_string()),
            };
            print_json(&status)?;
        }
        Command::Profile => print_json(&client.profile().await?)?,
        Command::Unread => {
            print_json(&client.unread_counts(&UnreadCountOptions::default()).await?)?
        }
        Command::Categories => print_json(&client.categories().await?)?,
        Command::Subscriptions => print_json(&client.subscriptions().await?)?,
    }
    Ok(())
}

#[derive(Serialize)]
struct Status {
    state: String,
    user_id: Option<String>,
    expires_at: Option<String>,
    expires_in_secs: Option<u64>,
    token_file: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("feedly={level},tower_http={level},warn"))
    });

    // Logs go to stderr so command output stays pipeable.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
