use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Whole-request deadline. Must leave room for one password hash.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

/// Which subjects may mutate an account.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipPolicySetting {
    #[default]
    Unrestricted,
    SelfOnly,
}

#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_hash_work_factor")]
    pub hash_work_factor: u32,
    #[serde(default = "default_hash_memory_kib")]
    pub hash_memory_kib: u32,
    #[serde(default)]
    pub ownership_policy: OwnershipPolicySetting,
    /// Interval of the account count log line; 0 disables it.
    #[serde(default = "default_count_report_secs")]
    pub count_report_secs: u64,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("hash_work_factor", &self.hash_work_factor)
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("ownership_policy", &self.ownership_policy)
            .field("count_report_secs", &self.count_report_secs)
            .finish()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
            hash_work_factor: default_hash_work_factor(),
            hash_memory_kib: default_hash_memory_kib(),
            ownership_policy: OwnershipPolicySetting::default(),
            count_report_secs: default_count_report_secs(),
        }
    }
}

fn default_request_timeout() -> u64 { 10 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_acquire_timeout() -> u64 { 30 }
fn default_token_ttl_minutes() -> i64 { 15 }
fn default_hash_work_factor() -> u32 { 2 }
fn default_hash_memory_kib() -> u32 { 19 * 1024 }
fn default_count_report_secs() -> u64 { 10 }

pub const MIN_WORK_FACTOR: u32 = 1;
pub const MAX_WORK_FACTOR: u32 = 10;

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `CONFIG_PATH` (or `config.toml`), falling back to defaults when the
    /// file is missing, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env(&env);
        self.database.validate()?;
        self.auth.normalize_from_env(&env)?;
        self.auth.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("server.request_timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

/// Environment value for `key`, ignoring blank ones. Set values override the file.
fn env_value(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(url) = env_value(&env, "DATABASE_URL") {
            self.url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive numbers of seconds"));
        }
        Ok(())
    }
}

impl AuthSettings {
    pub fn normalize_from_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(secret) = env_value(&env, "JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(ttl) = env_value(&env, "JWT_TTL_MINUTES") {
            self.token_ttl_minutes = ttl
                .trim()
                .parse()
                .map_err(|e| anyhow!("JWT_TTL_MINUTES is not an integer: {e}"))?;
        }
        if let Some(wf) = env_value(&env, "HASH_WORK_FACTOR") {
            self.hash_work_factor = wf
                .trim()
                .parse()
                .map_err(|e| anyhow!("HASH_WORK_FACTOR is not an integer: {e}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("auth.jwt_secret is empty; set it in config.toml or JWT_SECRET"));
        }
        if self.token_ttl_minutes <= 0 {
            return Err(anyhow!("auth.token_ttl_minutes must be positive"));
        }
        if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&self.hash_work_factor) {
            return Err(anyhow!(
                "auth.hash_work_factor must be within {MIN_WORK_FACTOR}..={MAX_WORK_FACTOR}"
            ));
        }
        if self.hash_memory_kib < 8 {
            return Err(anyhow!("auth.hash_memory_kib must be >= 8"));
        }
        Ok(())
    }
}
