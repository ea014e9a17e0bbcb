use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Show server status information
    Info {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user and optionally a token for them
    Add {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// External identifier of the user
        #[arg(long)]
        uid: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        surname: Option<String>,

        /// Create a token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --uid, --email, --name, --surname)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Remove a user that owns no records
    Remove {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Uid of the user to remove
        #[arg(long)]
        uid: Option<String>,

        /// Skip interactive prompts (requires --uid)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List users
    List {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Create a new access token for a user
    Create {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Uid of the user the token is for
        #[arg(long)]
        uid: Option<String>,

        /// Days until expiration (0 or less for no expiration)
        #[arg(long)]
        expires_days: Option<i64>,

        /// Skip interactive prompts (requires --uid)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Revoke an access token
    Revoke {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Token ID to revoke
        #[arg(long)]
        token_id: Option<String>,

        /// Skip interactive prompts (requires --token-id)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List access tokens
    List {
        /// Data directory for the database and settings file
        #[arg(long, env = "HALODB_DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
