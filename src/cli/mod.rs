mod commands;
mod info;
mod init;
pub mod pickers;
mod token;
mod user;

pub use commands::{AdminCommands, TokenCommands, UserCommands};
pub use info::run_info;
pub use init::{ADMIN_TOKEN_FILE, run_init};
pub use token::{run_token_create, run_token_list, run_token_revoke};
pub use user::{run_user_add, run_user_list, run_user_remove};

use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::store::SqliteStore;

/// Open the store of an initialized data directory
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let config = ServerConfig {
        data_dir: PathBuf::from(data_dir),
        ..ServerConfig::default()
    };
    let db_path = config.db_path();

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'halodb admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
