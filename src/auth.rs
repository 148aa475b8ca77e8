//! Role assignment for incoming connections

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What a connection is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Manages the bank, the configuration and the session lifecycle
    Admin,
    /// Takes the quiz
    Participant,
    /// Not signed in
    None,
}

/// Maps login credentials to a role
pub trait Authenticator: Send + Sync {
    /// Returns the role for the credentials, [`Role::None`] if unknown
    fn authenticate(&self, username: &str, password: &str) -> Role;
}

/// Fixed table of accounts
#[derive(Debug, Clone)]
pub struct CredentialTable {
    accounts: HashMap<String, (String, Role)>,
}

impl CredentialTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
        }
    }

    /// Adds or replaces an account
    #[must_use]
    pub fn with_account(mut self, username: &str, password: &str, role: Role) -> Self {
        self.accounts
            .insert(username.to_owned(), (password.to_owned(), role));
        self
    }
}

impl Default for CredentialTable {
    /// The demo accounts `admin` / `admin123` and `student` / `pass123`
    fn default() -> Self {
        Self::new()
            .with_account("admin", "admin123", Role::Admin)
            .with_account("student", "pass123", Role::Participant)
    }
}

impl Authenticator for CredentialTable {
    fn authenticate(&self, username: &str, password: &str) -> Role {
        match self.accounts.get(username) {
            Some((expected, role)) if expected == password => *role,
            _ => {
                tracing::debug!(username, "login rejected");
                Role::None
            }
        }
    }
}
