/// Validate a username presented at login: non-empty, ASCII letters and
/// digits only.
pub fn validate_username(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Username may only contain letters and digits".to_string());
    }
    Ok(())
}

/// Case-insensitive username comparison; usernames are unique under this
/// equivalence across active players.
pub fn usernames_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
