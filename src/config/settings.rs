use serde_json::{ Map, Value };
use std::fs;
use std::io::Write;
use std::path::{ Path, PathBuf };
use thiserror::Error;
use log::{ debug, info };

use crate::config::prompt::PromptTemplate;
use crate::llm::LlmConfig;

/// Fixed storage key the chat client keeps its API key under.
pub const API_KEY_STORAGE_KEY: &str = "mun_api_key";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings file IO error for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings file '{path}' is not a JSON object: {reason}")]
    Malformed {
        path: String,
        reason: String,
    },
}

/// Persistent key/value storage for the client credential.
pub trait CredentialStore: Send {
    fn load_api_key(&self) -> Result<Option<String>, SettingsError>;
    fn save_api_key(&mut self, api_key: &str) -> Result<(), SettingsError>;
}

/// JSON object on disk; unrelated keys in the file are preserved on write.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<Map<String, Value>, SettingsError> {
        let path_str = self.path.display().to_string();
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", path_str);
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(SettingsError::Io { path: path_str, source: e });
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) =>
                Err(SettingsError::Malformed {
                    path: path_str,
                    reason: "top-level value is not an object".to_string(),
                }),
            Err(e) => Err(SettingsError::Malformed { path: path_str, reason: e.to_string() }),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_api_key(&self) -> Result<Option<String>, SettingsError> {
        let map = self.read_map()?;
        Ok(
            map
                .get(API_KEY_STORAGE_KEY)
                .and_then(Value::as_str)
                .filter(|k| !k.trim().is_empty())
                .map(str::to_owned)
        )
    }

    fn save_api_key(&mut self, api_key: &str) -> Result<(), SettingsError> {
        let mut map = self.read_map()?;
        map.insert(API_KEY_STORAGE_KEY.to_string(), Value::String(api_key.to_string()));
        let body = serde_json::to_string_pretty(&Value::Object(map)).map_err(|e|
            SettingsError::Malformed { path: self.path.display().to_string(), reason: e.to_string() }
        )?;
        write_private(&self.path, &body).map_err(|e| SettingsError::Io {
            path: self.path.display().to_string(),
            source: e,
        })?;
        info!("Stored API key in {}", self.path.display());
        Ok(())
    }
}

/// Writes the file readable by its owner only; existing files are narrowed too.
fn write_private(path: &Path, body: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(body.as_bytes())
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    api_key: Option<String>,
}

impl MemoryCredentialStore {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_api_key(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    fn save_api_key(&mut self, api_key: &str) -> Result<(), SettingsError> {
        self.api_key = Some(api_key.to_string());
        Ok(())
    }
}

/// Everything a chat client needs at startup, passed explicitly.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub template: PromptTemplate,
}

impl Settings {
    pub fn new(llm: LlmConfig, template: PromptTemplate) -> Self {
        Self { llm, template }
    }

    /// Returns a copy carrying a different API key.
    pub fn with_api_key(&self, api_key: Option<String>) -> Self {
        let mut next = self.clone();
        next.llm.api_key = api_key.filter(|k| !k.trim().is_empty());
        next
    }
}

/// An explicit key wins; otherwise fall back to the stored one.
pub fn resolve_api_key(
    explicit: Option<&str>,
    store: &dyn CredentialStore
) -> Result<Option<String>, SettingsError> {
    match explicit {
        Some(k) if !k.trim().is_empty() => Ok(Some(k.to_string())),
        _ => store.load_api_key(),
    }
}
