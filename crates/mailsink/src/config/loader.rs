use std::collections::HashMap;
use std::path::Path;

use crate::config::schema::Settings;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let settings: Settings = serde_json::from_value(json_value)?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let compiled =
        jsonschema::JSONSchema::compile(&schema).map_err(|e| ConfigError::Validation {
            message: format!("Failed to compile JSON schema: {}", e),
        })?;

    let result = compiled.validate(json_value);
    if let Err(errors) = result {
        let error_messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", settings.version),
        });
    }

    if !settings.target_mailbox.contains('@') {
        return Err(ConfigError::Validation {
            message: format!(
                "targetMailbox '{}' is not a mailbox address",
                settings.target_mailbox
            ),
        });
    }

    if settings.retry_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "retryAttempts must be at least 1".to_string(),
        });
    }

    if settings.hours_to_fetch == 0 {
        return Err(ConfigError::Validation {
            message: "hoursToFetch must be at least 1".to_string(),
        });
    }

    if settings.import_folder.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "importFolder must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Allow-list file shape: an object of address/domain entries to labels.
/// A single key may carry several entries separated by commas, semicolons,
/// or newlines.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllowListFile {
    #[serde(default)]
    allowed_senders: HashMap<String, String>,
}

pub fn load_allow_list<P: AsRef<Path>>(path: P) -> Result<HashMap<String, String>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_allow_list_from_str(&content)
}

pub fn load_allow_list_from_str(content: &str) -> Result<HashMap<String, String>, ConfigError> {
    let file: AllowListFile = serde_json::from_str(content)?;

    let mut entries = HashMap::new();
    for (raw, label) in file.allowed_senders {
        for part in raw.split([',', ';', '\n', '\r']) {
            let entry = part.trim().to_lowercase();
            if entry.is_empty() {
                continue;
            }
            entries.insert(entry, label.clone());
        }
    }
    Ok(entries)
}
