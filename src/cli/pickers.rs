use std::fmt;

use chrono::{DateTime, Duration, Utc};
use inquire::{InquireError, Select};

use crate::store::Store;
use crate::types::{Token, User};

pub struct UserDisplay {
    pub user: User,
}

impl fmt::Display for UserDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} <{}> ({})",
            self.user.name, self.user.surname, self.user.email, self.user.uid
        )
    }
}

/// Token with the uid of its owner, if any
pub struct TokenDisplay {
    pub token: Token,
    pub uid: Option<String>,
}

impl fmt::Display for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.uid.as_deref().unwrap_or("admin");
        let created = format_relative_time(&self.token.created_at);
        let last_used = match &self.token.last_used_at {
            Some(dt) => format_relative_time(dt),
            None => "never used".to_string(),
        };
        write!(
            f,
            "halodb_{}...  {}  created {}  {}",
            &self.token.token_lookup, owner, created, last_used
        )
    }
}

#[derive(Clone)]
pub struct ExpirationOption {
    pub label: &'static str,
    pub days: Option<i64>,
}

impl fmt::Display for ExpirationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (amount, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

pub fn list_users(store: &impl Store) -> anyhow::Result<Vec<UserDisplay>> {
    Ok(store
        .list_users(0, 1000)?
        .into_iter()
        .map(|user| UserDisplay { user })
        .collect())
}

pub fn list_tokens(store: &impl Store) -> anyhow::Result<Vec<TokenDisplay>> {
    let tokens = store.list_tokens("", 1000)?;
    let mut displays = Vec::with_capacity(tokens.len());

    for token in tokens {
        let uid = resolve_token_uid(store, &token)?;
        displays.push(TokenDisplay { token, uid });
    }

    Ok(displays)
}

/// Resolve the uid of the user a token belongs to
pub fn resolve_token_uid(store: &impl Store, token: &Token) -> anyhow::Result<Option<String>> {
    match token.user_id {
        Some(id) => Ok(store.get_user(id)?.map(|u| u.uid)),
        None => Ok(None),
    }
}

fn select<T: fmt::Display>(prompt: &str, options: Vec<T>) -> anyhow::Result<Option<T>> {
    let selection = Select::new(prompt, options)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(choice) => Ok(Some(choice)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn pick_user(store: &impl Store) -> anyhow::Result<Option<User>> {
    let users = list_users(store)?;
    if users.is_empty() {
        println!("No users found.");
        return Ok(None);
    }
    Ok(select("Select user:", users)?.map(|d| d.user))
}

pub fn pick_token(store: &impl Store) -> anyhow::Result<Option<Token>> {
    let tokens = list_tokens(store)?;
    if tokens.is_empty() {
        println!("No tokens found.");
        return Ok(None);
    }
    Ok(select("Select token:", tokens)?.map(|d| d.token))
}

/// Pick token expiration. `None` means the prompt was cancelled.
pub fn pick_expiration() -> anyhow::Result<Option<Option<Duration>>> {
    let options = vec![
        ExpirationOption {
            label: "30 days",
            days: Some(30),
        },
        ExpirationOption {
            label: "90 days",
            days: Some(90),
        },
        ExpirationOption {
            label: "1 year",
            days: Some(365),
        },
        ExpirationOption {
            label: "Never",
            days: None,
        },
    ];

    let selection = Select::new("Token expiration:", options)
        .with_page_size(4)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(opt) => Ok(Some(opt.days.map(Duration::days))),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get a user by uid or interactively pick one
pub fn get_or_pick_user(
    store: &impl Store,
    uid: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<Option<User>> {
    if let Some(uid) = uid {
        let user = store
            .get_user_by_uid(&uid)?
            .ok_or_else(|| anyhow::anyhow!("User not found: {uid}"))?;
        Ok(Some(user))
    } else if non_interactive {
        anyhow::bail!("--uid is required in non-interactive mode");
    } else {
        pick_user(store)
    }
}

/// Request confirmation for a destructive operation
pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}
