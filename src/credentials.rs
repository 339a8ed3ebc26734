use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

const KEYRING_SERVICE: &str = "mailmate";
const KEYRING_USER: &str = "gmail-refresh-token";
const ENV_REFRESH_TOKEN: &str = "MAILMATE_REFRESH_TOKEN";

/// Debug information about credential storage backends
#[derive(Debug, Clone)]
pub struct CredentialDebugInfo {
    pub keyring_enabled: bool,
    pub keyring_has_token: bool,
    pub env_var_set: bool,
    pub file_path: PathBuf,
    pub file_exists: bool,
}

impl std::fmt::Display for CredentialDebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Credential Storage Status:")?;
        writeln!(
            f,
            "  Keyring: {}",
            match (self.keyring_enabled, self.keyring_has_token) {
                (false, _) => "disabled",
                (true, true) => "token stored",
                (true, false) => "empty",
            }
        )?;
        writeln!(
            f,
            "  Environment var ({}): {}",
            ENV_REFRESH_TOKEN,
            if self.env_var_set { "set" } else { "not set" }
        )?;
        writeln!(f, "  File fallback: {}", self.file_path.display())?;
        writeln!(f, "  File exists: {}", self.file_exists)?;
        Ok(())
    }
}

/// Storage for the OAuth2 refresh token backing the session.
///
/// Lookup order: `MAILMATE_REFRESH_TOKEN`, system keyring, then a `0600`
/// file in the config directory.
pub struct CredentialStore {
    token_file: PathBuf,
    use_keyring: bool,
}

impl CredentialStore {
    pub fn new() -> Self {
        let token_file = crate::config::Config::config_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".refresh_token");

        Self {
            token_file,
            use_keyring: true,
        }
    }

    /// File-only store, bypassing the keyring.
    #[cfg(test)]
    pub fn with_token_file(path: PathBuf) -> Self {
        Self {
            token_file: path,
            use_keyring: false,
        }
    }

    pub fn debug_info(&self) -> CredentialDebugInfo {
        CredentialDebugInfo {
            keyring_enabled: self.use_keyring,
            keyring_has_token: self.keyring_get().is_some(),
            env_var_set: Self::env_token().is_some(),
            file_path: self.token_file.clone(),
            file_exists: self.token_file.exists(),
        }
    }

    fn env_token() -> Option<String> {
        env::var(ENV_REFRESH_TOKEN).ok().filter(|s| !s.is_empty())
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        if !self.use_keyring {
            return None;
        }
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).ok()
    }

    fn keyring_get(&self) -> Option<String> {
        self.keyring_entry()?.get_password().ok()
    }

    fn keyring_set(&self, token: &str) -> bool {
        self.keyring_entry()
            .map(|entry| entry.set_password(token).is_ok())
            .unwrap_or(false)
    }

    fn file_get(&self) -> Option<String> {
        fs::read_to_string(&self.token_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn file_set(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.token_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        // Create with restricted permissions up front to avoid TOCTOU
        #[cfg(unix)]
        {
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.token_file)
                .with_context(|| format!("Failed to open {}", self.token_file.display()))?;
            file.write_all(token.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.token_file, token)?;
        }

        Ok(())
    }

    pub fn refresh_token(&self) -> Option<String> {
        Self::env_token()
            .or_else(|| self.keyring_get())
            .or_else(|| self.file_get())
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        if self.keyring_set(token) && self.keyring_get().is_some() {
            tracing::debug!("Refresh token stored in keyring");
            return Ok(());
        }

        tracing::debug!(
            "Keyring unavailable, storing refresh token in {}",
            self.token_file.display()
        );
        self.file_set(token)
    }

    pub fn has_credentials(&self) -> bool {
        self.refresh_token().is_some()
    }

    /// Forget the stored token everywhere it may live. The env var is left alone.
    pub fn delete_all(&self) -> Result<()> {
        if let Some(entry) = self.keyring_entry() {
            let _ = entry.delete_credential();
        }

        match fs::remove_file(&self.token_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove {}", self.token_file.display())),
        }
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
