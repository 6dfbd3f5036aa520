use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use command_center_canvas::RenderRequest;
use command_center_core::config::{
    AuthConfig, AuthMode, Config, LoggingConfig, ServerConfig, StorageConfig,
};
use command_center_gateway::GatewayState;

mod client;

use client::{CanvasClient, parse_props};

#[derive(Parser)]
#[command(
    name = "command-center",
    about = "Push-based status cache and live canvas broadcaster",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,

        /// Directory for persisted JSON documents
        #[arg(long)]
        data_dir: Option<String>,

        /// Directory of the viewer UI to serve at /
        #[arg(long)]
        static_dir: Option<String>,

        /// Leave write endpoints unauthenticated
        #[arg(long)]
        no_auth: bool,
    },

    /// Drive canvas surfaces on a running server
    Canvas {
        /// Server base URL
        #[arg(long, env = "COMMAND_CENTER_URL", default_value = "http://127.0.0.1:8000")]
        server: String,

        /// Bearer token for write requests
        #[arg(long, env = "API_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[command(subcommand)]
        action: CanvasAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CanvasAction {
    /// List current surfaces
    List,
    /// Create or replace a surface
    Render {
        id: String,
        component: String,
        /// Component props as a JSON object
        #[arg(long, default_value = "{}")]
        props: String,
        #[arg(long)]
        callback_url: Option<String>,
    },
    /// Delete a surface
    Delete { id: String },
    /// Show recent viewer callbacks
    Callbacks,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (secrets redacted)
    Show,
}

/// Initialize tracing from `RUST_LOG`, falling back to the logging config.
fn init_tracing(logging: Option<&LoggingConfig>, verbose: bool) {
    let mut directives = vec![if verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }];
    if let Some(logging) = logging {
        directives.extend(logging.filters.iter().cloned());
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives.join(",")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.is_some_and(|l| l.format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Fold `serve` flags into the loaded config.
fn apply_serve_overrides(
    config: &mut Config,
    port: Option<u16>,
    bind: Option<String>,
    data_dir: Option<String>,
    static_dir: Option<String>,
    no_auth: bool,
) {
    if port.is_some() || bind.is_some() || static_dir.is_some() {
        let server = config.server.get_or_insert_with(|| ServerConfig {
            port: 8000,
            bind: None,
            static_dir: None,
        });
        if let Some(port) = port {
            server.port = port;
        }
        if bind.is_some() {
            server.bind = bind;
        }
        if static_dir.is_some() {
            server.static_dir = static_dir;
        }
    }
    if data_dir.is_some() {
        config.storage = Some(StorageConfig { data_dir });
    }
    if no_auth {
        config.auth.get_or_insert_with(AuthConfig::default).mode = Some("none".into());
    }
}

fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(auth) = config.auth.as_mut() {
        if auth.token.is_some() {
            auth.token = Some("***".into());
        }
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    init_tracing(config.logging.as_ref(), cli.verbose);

    match cli.command {
        Commands::Serve {
            port,
            bind,
            data_dir,
            static_dir,
            no_auth,
        } => {
            apply_serve_overrides(&mut config, port, bind, data_dir, static_dir, no_auth);
            let auth = config.auth_mode()?;
            if auth == AuthMode::Open {
                tracing::warn!("Write endpoints are open: no API token required");
            }
            tracing::info!(data_dir = %config.data_dir().display(), "Starting Command Center");

            let state = Arc::new(GatewayState::load(config, auth).await);
            command_center_gateway::start_gateway(state).await?;
        }
        Commands::Canvas {
            server,
            token,
            action,
        } => {
            let client = CanvasClient::new(&server, token);
            match action {
                CanvasAction::List => {
                    let surfaces = client.list().await?;
                    println!("{}", serde_json::to_string_pretty(&surfaces)?);
                }
                CanvasAction::Render {
                    id,
                    component,
                    props,
                    callback_url,
                } => {
                    let request = RenderRequest {
                        id,
                        component,
                        props: parse_props(&props)?,
                        callback_url,
                    };
                    let resp = client.render(&request).await?;
                    println!("{resp}");
                }
                CanvasAction::Delete { id } => {
                    if client.delete(&id).await? {
                        println!("Deleted {id}");
                    } else {
                        anyhow::bail!("Surface not found: {id}");
                    }
                }
                CanvasAction::Callbacks => {
                    let callbacks = client.callbacks().await?;
                    println!("{}", serde_json::to_string_pretty(&callbacks)?);
                }
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&redacted(&config))?);
            }
        },
    }

    Ok(())
}
