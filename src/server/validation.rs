use crate::server::response::ApiError;

const MAX_GROUP_NAME_LEN: usize = 64;
const MAX_PROJECT_NAME_LEN: usize = 100;
const MAX_UID_LEN: usize = 128;

fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.')
}

fn validate_name(name: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.len() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if !name.chars().all(is_valid_name_char) {
        return Err(format!(
            "{entity} name can only contain alphanumeric characters, spaces, hyphens, underscores, and periods"
        ));
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(format!("{entity} name cannot start or end with a space"));
    }
    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Group", MAX_GROUP_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_project_name(name: &str) -> Result<(), ApiError> {
    validate_name(name, "Project", MAX_PROJECT_NAME_LEN).map_err(ApiError::bad_request)
}

/// Uids come from an external identity provider; only their shape is checked.
pub fn validate_uid(uid: &str) -> Result<(), String> {
    if uid.is_empty() {
        return Err("uid cannot be empty".to_string());
    }
    if uid.len() > MAX_UID_LEN {
        return Err(format!("uid cannot exceed {MAX_UID_LEN} characters"));
    }
    if uid.chars().any(char::is_whitespace) {
        return Err("uid cannot contain whitespace".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(format!("'{email}' is not a valid email address"));
    }
    Ok(())
}
