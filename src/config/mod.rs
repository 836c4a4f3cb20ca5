use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub name: Option<String>,
    pub params: Option<BTreeMap<String, String>>,
    pub page_size: Option<i64>,
    pub page_sizes: Option<Vec<u32>>,
    pub allow_unlimited: Option<bool>,
    pub sort: Option<String>,
    #[serde(alias = "sort-desc")]
    pub sort_desc: Option<bool>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub header: Option<String>,
    pub preferences_dir: Option<String>,
    pub current_url: Option<String>,
    pub delete_url: Option<String>,
    pub delete_param: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn config_home() -> Option<PathBuf> {
    Some(home_dir()?.join(".listpager"))
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(config_home()?.join("config.yml"))
}

pub fn default_preferences_dir() -> PathBuf {
    config_home()
        .map(|home| home.join("views"))
        .unwrap_or_else(|| PathBuf::from(".listpager").join("views"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn parse_config(contents: &str, path: &Path) -> Result<ConfigFile, String> {
    serde_yaml::from_str::<ConfigFile>(contents)
        .map_err(|e| format!("failed to parse config '{}': {e}", path.display()))
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# listpager config
#
# Location (default):
#   ~/.listpager/config.yml

# Listing endpoint
# url: https://meetings.example.org/reservation-request/list-data
# params:
#   specification-type: ROOM
name: default

# Paging
page_size: 10
page_sizes: [10, 15, 20]
allow_unlimited: false
# sort: DATETIME
# sort_desc: true

# HTTP (optional)
timeout: 10
# proxy: http://127.0.0.1:8080
# header: "Cookie: JSESSIONID=..."

# View preferences are stored per view name in this directory
# preferences_dir: ~/.listpager/views

# Error content back-links and bulk delete (optional)
# current_url: https://meetings.example.org/reservation-request/list
# delete_url: https://meetings.example.org/reservation-request/delete
# delete_param: id

# Output
output_format: text
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}
