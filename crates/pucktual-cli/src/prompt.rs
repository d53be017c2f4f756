//! Interactive credential input.

use std::io::{self, Write};

use anyhow::{bail, Result};

use pucktual_core::{CredentialStore, Credentials};

/// Environment variable that supplies the password non-interactively
const PASSWORD_ENV: &str = "PUCKTUAL_PASSWORD";

/// Maximum length for username input.
/// Usernames are typically email addresses, 50 chars covers most.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

fn read_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub fn password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    Ok(rpassword::prompt_password("Password: ")?)
}

/// Ask for username and password.
///
/// The username comes from `username` if given, otherwise the prompt offers
/// the stored username as default.
pub fn credentials(store: &dyn CredentialStore, username: Option<String>) -> Result<Credentials> {
    let username = match username {
        Some(username) => username,
        None => match store.username()? {
            Some(last_user) => {
                let input = read_line(&format!("Username [{}]", last_user))?;
                if input.is_empty() {
                    last_user
                } else {
                    input
                }
            }
            None => read_line("Username")?,
        },
    };
    let password = password()?;

    let credentials = Credentials::new(username.trim(), password);
    validate(&credentials)?;
    Ok(credentials)
}

pub fn validate(credentials: &Credentials) -> Result<()> {
    if !credentials.is_complete() {
        bail!("Username and password required");
    }
    if !is_valid_input(&credentials.username, MAX_USERNAME_LENGTH) {
        bail!("Username must be at most {} printable characters", MAX_USERNAME_LENGTH);
    }
    if !is_valid_input(&credentials.password, MAX_PASSWORD_LENGTH) {
        bail!("Password must be at most {} printable characters", MAX_PASSWORD_LENGTH);
    }
    Ok(())
}

/// Within the length limit and free of control characters
fn is_valid_input(value: &str, max_len: usize) -> bool {
    value.chars().count() <= max_len && !value.chars().any(char::is_control)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_input() {
        assert!(is_valid_input("barista@example.com", MAX_USERNAME_LENGTH));
        assert!(is_valid_input(&"a".repeat(50), MAX_USERNAME_LENGTH));
        assert!(!is_valid_input(&"a".repeat(51), MAX_USERNAME_LENGTH));
        // Control characters rejected
        assert!(!is_valid_input("bar\nista", MAX_USERNAME_LENGTH));
        assert!(!is_valid_input("pass\x00", MAX_PASSWORD_LENGTH));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&Credentials::new("u", "p")).is_ok());
        assert!(validate(&Credentials::new("", "p")).is_err());
        assert!(validate(&Credentials::new("u", "")).is_err());
        assert!(validate(&Credentials::new("u", "x".repeat(129))).is_err());
        assert!(validate(&Credentials::new("u", "x".repeat(128))).is_ok());
    }
}
