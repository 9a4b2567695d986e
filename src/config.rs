//! Configuration management for the badge server

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Endpoints of the two external badge registries
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ExternalConfig {
    /// Source A: plain JSON array, supports `GET <url>/<id>`
    pub badges_url: String,
    /// Source B: `{ "data": [...] }` envelope
    pub principaux_url: String,
    /// Per-request timeout, applied to each call independently
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PrinterConfig {
    pub model: String,
    pub backend: String,
    pub usb_vendor_id: String,
    pub usb_product_id: String,
    /// Printer driver executable
    pub command: String,
    /// Where USB devices are enumerated for printer detection
    pub usb_devices_path: String,
}

impl PrinterConfig {
    /// Device address in the `usb://0xVVVV:0xPPPP` form understood by the driver
    pub fn identifier(&self) -> String {
        format!("usb://{}:{}", self.usb_vendor_id, self.usb_product_id)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LabelConfig {
    /// Media size as named by the driver (e.g. `29x90`)
    pub size: String,
    pub rotate: String,
    pub cut: bool,
    pub width: u32,
    pub height: u32,
    pub start_font_size: u32,
    pub min_font_size: u32,
    pub font_step: u32,
    /// Preferred TrueType font, tried before the platform fonts
    pub font_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` or a comma separated list of origins
    pub origins: String,
}

impl CorsConfig {
    /// Explicit origins, or `None` when any origin is allowed
    pub fn origin_list(&self) -> Option<Vec<String>> {
        if self.origins.trim() == "*" {
            return None;
        }
        Some(
            self.origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub external: ExternalConfig,
    pub printer: PrinterConfig,
    pub label: LabelConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let font_var = if cfg!(windows) { "WINDOWS_FONT_PATH" } else { "LINUX_FONT_PATH" };

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // BADGES__LABEL__CUT=false style variables
            .add_source(
                Environment::with_prefix("BADGES")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Variable names kept from the deployment scripts
            .set_override_option(
                "database.url",
                env::var("DB_NAME").ok().map(|name| format!("sqlite://{}?mode=rwc", name)),
            )?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("external.badges_url", env::var("EXTERNAL_API_URL").ok())?
            .set_override_option(
                "external.principaux_url",
                env::var("EXTERNAL_PRINCIPAUX_API_URL").ok(),
            )?
            .set_override_option("printer.model", env::var("PRINTER_MODEL").ok())?
            .set_override_option("printer.backend", env::var("PRINTER_BACKEND").ok())?
            .set_override_option("printer.usb_vendor_id", env::var("PRINTER_USB_VENDOR_ID").ok())?
            .set_override_option("printer.usb_product_id", env::var("PRINTER_USB_PRODUCT_ID").ok())?
            .set_override_option("label.size", env::var("LABEL_SIZE").ok())?
            .set_override_option("label.rotate", env::var("LABEL_ROTATE").ok())?
            .set_override_option("label.cut", env::var("LABEL_CUT").ok())?
            .set_override_option("label.font_path", env::var(font_var).ok())?
            .set_override_option("cors.origins", env::var("CORS_ORIGINS").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://badges.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            badges_url: "http://badges.eevent.ma/api/getbadges".to_string(),
            principaux_url: "https://eevent.ma/api/inscritslemm".to_string(),
            timeout_secs: 5,
        }
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            model: "QL-810W".to_string(),
            backend: "pyusb".to_string(),
            usb_vendor_id: "0x04f9".to_string(),
            usb_product_id: "0x209c".to_string(),
            command: "brother_ql".to_string(),
            usb_devices_path: "/sys/bus/usb/devices".to_string(),
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            size: "29x90".to_string(),
            rotate: "90".to_string(),
            cut: true,
            width: 991,
            height: 306,
            start_font_size: 120,
            min_font_size: 20,
            font_step: 5,
            font_path: None,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: "*".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
