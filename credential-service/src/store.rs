//! The credential table: username to obfuscated password, read-only after
//! load. Plaintext passwords exist only transiently inside the loader; the
//! stored form and the form arriving over the wire are both obfuscated, so
//! verification never compares plaintext.

use anyhow::{Context, Result};
use exchange_core::cipher::obfuscate;
use std::collections::HashMap;
use std::path::Path;

pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not open members file {}", path.display()))?;
        Ok(Self::from_lines(&contents))
    }

    /// Each line is `<username> <plaintext_password>`; other lines are
    /// skipped. Usernames are keyed lowercased for case-insensitive match.
    pub fn from_lines(contents: &str) -> Self {
        let mut users = HashMap::new();
        for line in contents.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [username, password] = parts.as_slice() else {
                continue;
            };
            users.insert(username.to_lowercase(), obfuscate(password));
        }
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// True iff the username exists (case-insensitively) and the supplied
    /// already-obfuscated password equals the stored obfuscated password.
    pub fn verify(&self, username: &str, obfuscated: &str) -> bool {
        self.users
            .get(&username.to_lowercase())
            .is_some_and(|stored| stored == obfuscated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::from_lines("Alice Pass123\nbob hunter2\n\nmalformed\n")
    }

    #[test]
    fn loads_well_formed_lines_only() {
        assert_eq!(store().len(), 2);
    }

    #[test]
    fn verifies_obfuscated_against_obfuscated() {
        let store = store();
        assert!(store.verify("Alice", &obfuscate("Pass123")));
        // The plaintext itself must not pass.
        assert!(!store.verify("Alice", "Pass123"));
    }

    #[test]
    fn username_match_is_case_insensitive() {
        let store = store();
        assert!(store.verify("ALICE", &obfuscate("Pass123")));
        assert!(store.verify("alice", &obfuscate("Pass123")));
    }

    #[test]
    fn wrong_password_or_unknown_user_fails() {
        let store = store();
        assert!(!store.verify("Alice", &obfuscate("wrong")));
        assert!(!store.verify("carol", &obfuscate("Pass123")));
    }
}
