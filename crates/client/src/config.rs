use std::path::PathBuf;

/// Default backend base URL, matching the development server.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    /// File holding the single persisted bearer credential.
    pub credential_file: PathBuf,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CABIN_API_URL must be an http(s) URL, got {0:?}")]
    InvalidApiUrl(String),

    #[error("CABIN_CREDENTIAL_FILE is unset and no home directory is known")]
    NoCredentialLocation,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                       |
    /// |-------------------------|-------------------------------|
    /// | `CABIN_API_URL`         | `http://localhost:3000/api`   |
    /// | `CABIN_CREDENTIAL_FILE` | `$HOME/.familycabin/token`    |
    /// | `CABIN_USER_AGENT`      | `familycabin/<version>`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = normalize_api_url(
            lookup("CABIN_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
        )?;

        let credential_file = match lookup("CABIN_CREDENTIAL_FILE").filter(|s| !s.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => lookup("HOME")
                .filter(|s| !s.is_empty())
                .map(|home| PathBuf::from(home).join(".familycabin").join("token"))
                .ok_or(ConfigError::NoCredentialLocation)?,
        };

        let user_agent = lookup("CABIN_USER_AGENT")
            .unwrap_or_else(|| format!("familycabin/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            api_url,
            credential_file,
            user_agent,
        })
    }

    /// Point at `api_url` with a throwaway credential location; for tests
    /// and tools that inject their own store.
    pub fn for_api(api_url: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url(api_url.into())?,
            credential_file: std::env::temp_dir().join("familycabin-token"),
            user_agent: format!("familycabin/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}

fn normalize_api_url(raw: String) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidApiUrl(raw));
    }
    Ok(trimmed.to_string())
}
