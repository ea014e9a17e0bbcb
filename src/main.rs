use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use halodb::cli::{
    ADMIN_TOKEN_FILE, AdminCommands, TokenCommands, UserCommands, run_info, run_init,
    run_token_create, run_token_list, run_token_revoke, run_user_add, run_user_list,
    run_user_remove,
};
use halodb::config::ServerConfig;
use halodb::server::{AppState, create_router};
use halodb::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "halodb")]
#[command(about = "Metadata server for omic samples and their sequencing steps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(long, env = "HALODB_HOST")]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(long, short, env = "HALODB_PORT")]
        port: Option<u16>,

        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Requests allowed per minute and client address, 0 disables the limit [default: 100]
        #[arg(long, env = "HALODB_RATE_LIMIT")]
        rate_limit: Option<u32>,
    },
}

fn run_admin(command: AdminCommands) -> anyhow::Result<()> {
    match command {
        AdminCommands::Init {
            data_dir,
            non_interactive,
        } => run_init(data_dir, non_interactive),
        AdminCommands::User { command } => match command {
            UserCommands::Add {
                data_dir,
                uid,
                email,
                name,
                surname,
                create_token,
                non_interactive,
            } => run_user_add(
                data_dir,
                uid,
                email,
                name,
                surname,
                create_token,
                non_interactive,
            ),
            UserCommands::Remove {
                data_dir,
                uid,
                non_interactive,
                yes,
            } => run_user_remove(data_dir, uid, non_interactive, yes),
            UserCommands::List { data_dir, json } => run_user_list(data_dir, json),
        },
        AdminCommands::Token { command } => match command {
            TokenCommands::Create {
                data_dir,
                uid,
                expires_days,
                non_interactive,
            } => run_token_create(data_dir, uid, expires_days, non_interactive),
            TokenCommands::Revoke {
                data_dir,
                token_id,
                non_interactive,
                yes,
            } => run_token_revoke(data_dir, token_id, non_interactive, yes),
            TokenCommands::List { data_dir, json } => run_token_list(data_dir, json),
        },
        AdminCommands::Info { data_dir, json } => run_info(data_dir, json),
    }
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    data_dir: String,
    rate_limit: Option<u32>,
) -> anyhow::Result<()> {
    let config = ServerConfig::resolve(PathBuf::from(data_dir), host, port, rate_limit)?;

    let token_file = config.data_dir.join(ADMIN_TOKEN_FILE);
    if !config.db_path().exists() {
        bail!(
            "Server not initialized. Run 'halodb admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'halodb admin init' first to create the database and admin token."
        );
    }

    if token_file.exists() {
        info!("Admin token available at {}", token_file.display());
    }

    let state = Arc::new(AppState::new(Arc::new(store), config.rate_limit_per_minute));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!(
        "Starting server on {} (rate limit: {}/min)",
        addr, config.rate_limit_per_minute
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("halodb=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => run_admin(command),
        Commands::Serve {
            host,
            port,
            data_dir,
            rate_limit,
        } => serve(host, port, data_dir, rate_limit).await,
    }
}
