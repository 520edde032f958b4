use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `MEDIAPLAN__` and nested section separator `__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub mailgun: MailgunConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Maximum accepted upload size in bytes. Uploads are buffered whole.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    /// Lifetime of signed view URLs, in seconds.
    #[serde(default = "default_signed_url_ttl_secs")]
    pub signed_url_ttl_secs: u64,
    /// Lifetime of signed download URLs, in seconds.
    #[serde(default = "default_signed_download_ttl_secs")]
    pub signed_download_ttl_secs: u64,
    /// Bucket name passed through to the object store.
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailgunConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_mailgun_domain")]
    pub domain: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Master switch for outbound email.
    #[serde(default = "default_email_enabled")]
    pub email_enabled: bool,
    /// Base URL used when building links into the web app.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Operator address copied on escalations.
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxConfig {
    /// How many times a failed side-effect job is retried before being dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Drain interval for the background worker, in milliseconds.
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,
}

// Default functions
fn default_node_id() -> String {
    "hub-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_max_file_size() -> usize {
    100 * 1024 * 1024
}
fn default_signed_url_ttl_secs() -> u64 {
    3600
}
fn default_signed_download_ttl_secs() -> u64 {
    300
}
fn default_bucket() -> String {
    "mediaplan-creative-assets".to_string()
}
fn default_mailgun_domain() -> String {
    "mg.mediaplan.example".to_string()
}
fn default_from_email() -> String {
    "no-reply@mediaplan.example".to_string()
}
fn default_from_name() -> String {
    "MediaPlan Hub".to_string()
}
fn default_email_enabled() -> bool {
    true
}
fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_admin_email() -> String {
    "ops@mediaplan.example".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_drain_interval_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            storage: StorageConfig::default(),
            mailgun: MailgunConfig::default(),
            notifications: NotificationConfig::default(),
            outbox: OutboxConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            signed_url_ttl_secs: default_signed_url_ttl_secs(),
            signed_download_ttl_secs: default_signed_download_ttl_secs(),
            bucket: default_bucket(),
        }
    }
}

impl Default for MailgunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            domain: default_mailgun_domain(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_enabled: default_email_enabled(),
            frontend_url: default_frontend_url(),
            admin_email: default_admin_email(),
        }
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            drain_interval_ms: default_drain_interval_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("MEDIAPLAN")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
