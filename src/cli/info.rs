use serde::Serialize;

use crate::store::Store;
use crate::types::{OmicSequence, StepTable};

use super::init_store;

#[derive(Serialize)]
struct ServerInfo {
    users: usize,
    admin_tokens: usize,
    user_tokens: usize,
    projects: usize,
    sequences: usize,
    records: i64,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let users = store.list_users(0, 10000)?;
    let tokens = store.list_tokens("", 10000)?;
    let projects = store.list_projects()?;

    let mut records = 0;
    for user in &users {
        records += store.count_user_records(user.id)?;
    }

    let admin_tokens = tokens.iter().filter(|t| t.is_admin).count();
    let info = ServerInfo {
        users: users.len(),
        admin_tokens,
        user_tokens: tokens.len() - admin_tokens,
        projects: projects.len(),
        sequences: OmicSequence::ALL.len(),
        records,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!();
    println!("halodb Server Status");
    println!("{}", "─".repeat(20));
    println!("Users:       {}", info.users);
    println!(
        "Tokens:      {} ({} admin, {} user)",
        tokens.len(),
        info.admin_tokens,
        info.user_tokens
    );
    println!("Projects:    {}", info.projects);
    println!(
        "Records:     {} across {} tables",
        info.records,
        StepTable::ALL.len()
    );
    println!("Sequences:   {}", info.sequences);
    println!();

    Ok(())
}
