use chrono::Utc;
use inquire::{Confirm, Text};
use inquire::validator::Validation;

use crate::auth::TokenGenerator;
use crate::server::validation::{validate_email, validate_uid};
use crate::store::Store;

use super::init_store;
use super::pickers::{confirm_action, get_or_pick_user, pick_expiration};

fn prompt_validated(label: &str, validate: fn(&str) -> Result<(), String>) -> anyhow::Result<String> {
    Ok(Text::new(label)
        .with_validator(move |input: &str| {
            Ok(validate(input)
                .map(|()| Validation::Valid)
                .unwrap_or_else(|e| Validation::Invalid(e.into())))
        })
        .prompt()?)
}

fn not_empty(input: &str) -> Result<(), String> {
    if input.trim().is_empty() {
        Err("Value cannot be empty".to_string())
    } else {
        Ok(())
    }
}

/// Takes a value given on the command line, or prompts for it.
fn field(
    value: Option<String>,
    flag: &str,
    label: &str,
    validate: fn(&str) -> Result<(), String>,
    non_interactive: bool,
) -> anyhow::Result<String> {
    match value {
        Some(v) => {
            validate(&v).map_err(anyhow::Error::msg)?;
            Ok(v)
        }
        None if non_interactive => anyhow::bail!("--{flag} is required in non-interactive mode"),
        None => prompt_validated(label, validate),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_user_add(
    data_dir: String,
    uid: Option<String>,
    email: Option<String>,
    name: Option<String>,
    surname: Option<String>,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let uid = field(uid, "uid", "User id:", validate_uid, non_interactive)?;
    if store.get_user_by_uid(&uid)?.is_some() {
        anyhow::bail!("User '{uid}' already exists");
    }

    let email = field(email, "email", "Email:", validate_email, non_interactive)?;
    if store.get_user_by_email(&email)?.is_some() {
        anyhow::bail!("Email '{email}' is already in use");
    }

    let name = field(name, "name", "Name:", not_empty, non_interactive)?;
    let surname = field(surname, "surname", "Surname:", not_empty, non_interactive)?;

    let user = store.create_user(&uid, &email, &name, &surname)?;

    println!();
    println!("Created user \"{}\" ({} {})", user.uid, user.name, user.surname);

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create access token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        let expires_in = if non_interactive {
            None
        } else {
            match pick_expiration()? {
                Some(exp) => exp,
                None => {
                    println!("Token creation cancelled.");
                    return Ok(());
                }
            }
        };

        let generator = TokenGenerator::new();
        let (token, raw_token) =
            generator.issue(false, Some(user.id), expires_in.map(|d| Utc::now() + d))?;
        store.create_token(&token)?;

        println!();
        println!("Token created: {raw_token}");
        println!("  Save this now - it cannot be retrieved later.");
    }

    println!();

    Ok(())
}

pub fn run_user_remove(
    data_dir: String,
    uid: Option<String>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let Some(user) = get_or_pick_user(&store, uid, non_interactive)? else {
        return Ok(());
    };

    let owned = store.count_user_records(user.id)?;
    if owned > 0 {
        anyhow::bail!(
            "User '{}' still owns {owned} record(s); delete or transfer them first",
            user.uid
        );
    }

    let confirmed = confirm_action(
        &format!(
            "Delete user '{}'? This will also delete their tokens, memberships and sharings.",
            user.uid
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    store.delete_user(user.id)?;

    println!();
    println!("Deleted user '{}'", user.uid);
    println!();

    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = store.list_users(0, 10000)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!();
    for user in &users {
        println!(
            "  {:<20} {} {} <{}>",
            user.uid, user.name, user.surname, user.email
        );
    }
    println!();

    Ok(())
}
