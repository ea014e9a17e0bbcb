use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::TokenGenerator;
use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

use super::run_user_add;

pub const ADMIN_TOKEN_FILE: &str = ".admin_token";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

/// Creates the database and the first admin token.
pub fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir: PathBuf::from(&data_dir),
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.data_dir.join(ADMIN_TOKEN_FILE);

    if store.has_admin_token()? {
        anyhow::bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = generator.issue(true, None, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive
        && inquire::Confirm::new("Would you like to create a first user?")
            .with_default(false)
            .prompt()?
    {
        drop(store);
        run_user_add(data_dir, None, None, None, None, false, false)?;
    }

    Ok(())
}
