use std::time::Duration;

use crate::models::MetodoPago;

/// Static settings the command engine runs with. Built once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Messages not starting with this are ignored.
    pub prefix: String,
    /// When set, only this channel is served.
    pub channel_scope: Option<String>,
    pub payment_methods: Vec<MetodoPago>,
    /// Stored by the registry as `registrado_por`.
    pub provenance: String,
    /// Candidates listed when a payment identifier is ambiguous.
    pub payment_match_cap: usize,
    /// Candidates listed when a query identifier is ambiguous.
    pub query_match_cap: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            channel_scope: None,
            payment_methods: MetodoPago::ALL.to_vec(),
            provenance: "whatsapp_bot".to_string(),
            payment_match_cap: 5,
            query_match_cap: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub registry_base_url: String,
    pub registry_api_key: Option<String>,
    pub registry_timeout: Duration,
    pub webhook_secret: Option<String>,
    pub bot: BotConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = BotConfig::default();

        let bot = BotConfig {
            prefix: std::env::var("BOT_PREFIX")
                .unwrap_or_else(|_| defaults.prefix.clone())
                .trim()
                .to_string(),
            channel_scope: std::env::var("BOT_CHANNEL_SCOPE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            payment_methods: match std::env::var("BOT_PAYMENT_METHODS") {
                Ok(raw) if !raw.trim().is_empty() => parse_payment_methods(&raw)?,
                _ => defaults.payment_methods.clone(),
            },
            provenance: std::env::var("BOT_PROVENANCE")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| defaults.provenance.clone()),
            payment_match_cap: parse_cap("BOT_PAYMENT_MATCH_CAP", defaults.payment_match_cap)?,
            query_match_cap: parse_cap("BOT_QUERY_MATCH_CAP", defaults.query_match_cap)?,
        };

        if bot.prefix.is_empty() {
            anyhow::bail!("BOT_PREFIX cannot be empty");
        }

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            registry_base_url: std::env::var("REGISTRY_BASE_URL")
                .map_err(|_| anyhow::anyhow!("REGISTRY_BASE_URL environment variable required"))
                .and_then(|raw| {
                    if raw.trim().is_empty() {
                        anyhow::bail!("REGISTRY_BASE_URL cannot be empty");
                    }
                    let parsed = url::Url::parse(raw.trim()).map_err(|e| {
                        anyhow::anyhow!("REGISTRY_BASE_URL is not a valid URL: {}", e)
                    })?;
                    if parsed.scheme() != "http" && parsed.scheme() != "https" {
                        anyhow::bail!("REGISTRY_BASE_URL must start with http:// or https://");
                    }
                    Ok(raw.trim().trim_end_matches('/').to_string())
                })?,
            registry_api_key: std::env::var("REGISTRY_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            registry_timeout: Duration::from_secs(
                std::env::var("REGISTRY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| {
                        anyhow::anyhow!("REGISTRY_TIMEOUT_SECS must be a whole number of seconds")
                    })?,
            ),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            bot,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Registry Base URL: {}", config.registry_base_url);
        tracing::debug!("Command prefix: {:?}", config.bot.prefix);
        if let Some(ref scope) = config.bot.channel_scope {
            tracing::info!("Serving only channel: {}", scope);
        }
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set, chat webhook accepts unauthenticated calls");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Comma-separated method names, e.g. `efectivo,transferencia`.
pub fn parse_payment_methods(raw: &str) -> anyhow::Result<Vec<MetodoPago>> {
    let mut methods = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let method: MetodoPago = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!("BOT_PAYMENT_METHODS: {}", e))?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        anyhow::bail!("BOT_PAYMENT_METHODS must name at least one method");
    }
    Ok(methods)
}

fn parse_cap(var: &str, default: usize) -> anyhow::Result<usize> {
    match std::env::var(var) {
        Ok(raw) => {
            let cap: usize = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{} must be a positive number", var))?;
            if cap == 0 {
                anyhow::bail!("{} must be at least 1", var);
            }
            Ok(cap)
        }
        Err(_) => Ok(default),
    }
}
