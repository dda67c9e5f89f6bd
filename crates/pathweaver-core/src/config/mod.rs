//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Pathweaver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub schedule: ScheduleConfig,
    pub calendar: CalendarConfig,
    pub validation: ValidationConfig,
}

/// Reasoning-service (LLM) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Every reasoning call is bounded; the editor must never hang on it.
    pub timeout_secs: u64,
}

/// Scheduling defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Daily study budget used when the caller does not supply one
    pub default_daily_hours: f64,
    /// Flat per-node estimate when the reasoning service is unavailable
    pub fallback_hours_per_node: f64,
}

/// Calendar provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub base_url: String,
    pub calendar_id: String,
    /// Local hour at which a study block's event starts
    pub day_start_hour: u32,
}

/// Edge validation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// When the reasoning service fails, mark the edge valid (true) or
    /// invalid (false). Either way the reason reads "Validation unavailable".
    pub fail_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                default_model: "anthropic/claude-sonnet-4-20250514".to_string(),
                fallback_models: vec![
                    "anthropic/claude-3-5-haiku-latest".to_string(),
                    "openai/gpt-4o-mini".to_string(),
                ],
                temperature: 0.2,
                max_tokens: 1024,
                timeout_secs: 8,
            },
            schedule: ScheduleConfig {
                default_daily_hours: 2.0,
                fallback_hours_per_node: 2.0,
            },
            calendar: CalendarConfig {
                base_url: "https://www.googleapis.com/calendar/v3".to_string(),
                calendar_id: "primary".to_string(),
                day_start_hour: 9,
            },
            validation: ValidationConfig { fail_open: true },
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("PATHWEAVER_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PATHWEAVER_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("pathweaver")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        if self.schedule.default_daily_hours <= 0.0 {
            return Err(anyhow!("schedule.default_daily_hours must be positive"));
        }
        if self.schedule.fallback_hours_per_node <= 0.0 {
            return Err(anyhow!("schedule.fallback_hours_per_node must be positive"));
        }
        if self.calendar.day_start_hour >= 24 {
            return Err(anyhow!("calendar.day_start_hour must be 0-23"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            "schedule.default_daily_hours" => Ok(self.schedule.default_daily_hours.to_string()),
            "schedule.fallback_hours_per_node" => {
                Ok(self.schedule.fallback_hours_per_node.to_string())
            }

            "calendar.base_url" => Ok(self.calendar.base_url.clone()),
            "calendar.calendar_id" => Ok(self.calendar.calendar_id.clone()),
            "calendar.day_start_hour" => Ok(self.calendar.day_start_hour.to_string()),

            "validation.fail_open" => Ok(self.validation.fail_open.to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use PATHWEAVER_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `pathweaver config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.default_model" => {
                self.llm.default_model = value.to_string();
            }
            "llm.fallback_models" => {
                self.llm.fallback_models = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "schedule.default_daily_hours" => {
                let hours: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid default_daily_hours value: {}", value))?;
                if hours <= 0.0 {
                    return Err(anyhow!("Daily hours must be positive"));
                }
                self.schedule.default_daily_hours = hours;
            }
            "schedule.fallback_hours_per_node" => {
                let hours: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid fallback_hours_per_node value: {}", value))?;
                if hours <= 0.0 {
                    return Err(anyhow!("Fallback hours must be positive"));
                }
                self.schedule.fallback_hours_per_node = hours;
            }

            "calendar.base_url" => {
                self.calendar.base_url = value.trim_end_matches('/').to_string();
            }
            "calendar.calendar_id" => {
                self.calendar.calendar_id = value.to_string();
            }
            "calendar.day_start_hour" => {
                let hour: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid day_start_hour value: {}", value))?;
                if hour >= 24 {
                    return Err(anyhow!("Day start hour must be 0-23"));
                }
                self.calendar.day_start_hour = hour;
            }

            "validation.fail_open" => {
                self.validation.fail_open = value
                    .parse()
                    .with_context(|| format!("Invalid fail_open value: {}", value))?;
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the PATHWEAVER_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `pathweaver config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "llm.default_model",
            "llm.fallback_models",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "schedule.default_daily_hours",
            "schedule.fallback_hours_per_node",
            "calendar.base_url",
            "calendar.calendar_id",
            "calendar.day_start_hour",
            "validation.fail_open",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
