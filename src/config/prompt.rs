use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert Model UN speech and debate advisor. Please provide responses that:
1. Use formal diplomatic language
2. Incorporate relevant UN frameworks and resolutions
3. Suggest specific examples and evidence
4. Maintain a balanced and diplomatic tone
5. Follow proper MUN protocol and etiquette";

#[derive(Debug)]
pub enum PromptError {
    EmptyInstruction(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptyInstruction(path) =>
                write!(f, "Prompt file '{}' has an empty system_instruction", path),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl std::error::Error for PromptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// A system instruction paired with the user's raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-string rendering for providers without a separate system role.
    pub fn inline(&self) -> String {
        format!("{}\n\nUser: {}", self.system, self.user)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system_instruction: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Wraps `input` verbatim; no trimming or validation happens here.
    pub fn wrap(&self, input: &str) -> Prompt {
        Prompt {
            system: self.system_instruction.clone(),
            user: input.to_string(),
        }
    }
}

pub fn load_template<P: AsRef<Path>>(path: P) -> Result<PromptTemplate, PromptError> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path)?;
    let template: PromptTemplate = serde_json::from_str(&file_content)?;
    if template.system_instruction.trim().is_empty() {
        return Err(PromptError::EmptyInstruction(path.display().to_string()));
    }
    info!("Loaded prompt template from {}", path.display());
    Ok(template)
}

/// Loads the template from `path` when given, otherwise the built-in persona.
pub fn resolve_template(path: Option<&str>) -> Result<PromptTemplate, PromptError> {
    match path {
        Some(p) if !p.trim().is_empty() => load_template(p),
        _ => Ok(PromptTemplate::default()),
    }
}
