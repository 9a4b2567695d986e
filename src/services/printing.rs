//! Label printing
//!
//! Labels are composed in-process and handed to a [`PrinterTransport`]. The
//! default transport drives the `brother_ql` command-line driver, which owns
//! the raster protocol and the USB connection.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use image::{GrayImage, ImageFormat};
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use utoipa::ToSchema;

use crate::{
    config::{LabelConfig, PrinterConfig},
    error::{AppError, AppResult},
    label::{compose_label, ComposedLabel, FontResolver, LabelLayout},
    models::badge::{BadgeId, BadgePayload, CreateBadge},
    repository::Repository,
};

/// Why a print did not go through, classified from the driver output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrintFailure {
    #[error("{0}")]
    NoBackend(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    DeviceNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl PrintFailure {
    /// Sort a driver error message into a failure kind
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("No backend available") {
            PrintFailure::NoBackend(message)
        } else if message.contains("Access denied") || message.contains("Permission denied") {
            PrintFailure::PermissionDenied(message)
        } else if message.contains("No such device") {
            PrintFailure::DeviceNotFound(message)
        } else {
            PrintFailure::Other(message)
        }
    }

    /// What an operator can do about it
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PrintFailure::NoBackend(_) => {
                Some("pyusb backend not available. Install with: pip install pyusb")
            }
            PrintFailure::PermissionDenied(_) if cfg!(windows) => {
                Some("USB access denied. Install WinUSB driver using Zadig.")
            }
            PrintFailure::PermissionDenied(_) => {
                Some("USB permission denied. Add user to lp group or create udev rule.")
            }
            PrintFailure::DeviceNotFound(_) => {
                Some("Printer not found. Check USB connection and run printer detection.")
            }
            PrintFailure::Other(_) => None,
        }
    }

    pub fn troubleshooting_message(&self) -> String {
        match self.hint() {
            Some(hint) => format!("Error printing label: {}\n\nTroubleshooting: {}", self, hint),
            None => format!("Error printing label: {}", self),
        }
    }
}

/// Printer settings for one job
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub model: String,
    pub identifier: String,
    pub backend: String,
    pub label_size: String,
    pub rotate: String,
    pub cut: bool,
}

impl PrintJob {
    pub fn new(printer: &PrinterConfig, label: &LabelConfig) -> Self {
        Self {
            model: printer.model.clone(),
            identifier: printer.identifier(),
            backend: printer.backend.clone(),
            label_size: label.size.clone(),
            rotate: label.rotate.clone(),
            cut: label.cut,
        }
    }
}

/// Sends a composed label to a physical printer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    async fn print(&self, image: &GrayImage, job: &PrintJob) -> Result<(), PrintFailure>;
}

static NEXT_LABEL: AtomicU64 = AtomicU64::new(0);

/// Transport running the `brother_ql` driver on a temporary PNG
#[derive(Debug, Clone)]
pub struct BrotherQlCommand {
    program: String,
}

impl BrotherQlCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Driver arguments for `job` printing `image_path`
    pub fn arguments(job: &PrintJob, image_path: &Path) -> Vec<String> {
        let mut args = vec![
            "--backend".to_string(),
            job.backend.clone(),
            "--model".to_string(),
            job.model.clone(),
            "--printer".to_string(),
            job.identifier.clone(),
            "print".to_string(),
            "--label".to_string(),
            job.label_size.clone(),
            "--rotate".to_string(),
            job.rotate.clone(),
            "--threshold".to_string(),
            "70".to_string(),
        ];
        if !job.cut {
            args.push("--no-cut".to_string());
        }
        args.push(image_path.display().to_string());
        args
    }

    fn temp_path() -> PathBuf {
        let n = NEXT_LABEL.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("badge-label-{}-{}.png", std::process::id(), n))
    }
}

#[async_trait]
impl PrinterTransport for BrotherQlCommand {
    async fn print(&self, image: &GrayImage, job: &PrintJob) -> Result<(), PrintFailure> {
        let png = encode_png(image).map_err(|e| PrintFailure::Other(e.to_string()))?;
        let path = Self::temp_path();
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| PrintFailure::Other(format!("Could not write label image: {}", e)))?;

        tracing::info!("Printing to {} using {} backend...", job.identifier, job.backend);

        let output = Command::new(&self.program)
            .args(Self::arguments(job, &path))
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!("Could not remove {}: {}", path.display(), e);
        }

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PrintFailure::NoBackend(format!(
                    "No backend available: {} is not installed",
                    self.program
                )));
            }
            Err(e) => return Err(PrintFailure::classify(e.to_string())),
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() { stdout } else { stderr };
        Err(PrintFailure::classify(message.trim()))
    }
}

/// Result of a successful print
#[derive(Debug, Serialize, ToSchema)]
pub struct PrintOutcome {
    pub status: String,
    pub message: String,
    #[schema(value_type = Option<String>)]
    pub id: Option<BadgeId>,
}

/// Printers found on the USB bus
#[derive(Debug, Serialize, ToSchema)]
pub struct PrinterDetection {
    pub status: String,
    pub printers: Vec<String>,
    pub message: String,
    pub current_config: String,
}

#[derive(Clone)]
pub struct PrintService {
    repository: Repository,
    transport: Arc<dyn PrinterTransport>,
    fonts: FontResolver,
    layout: LabelLayout,
    printer: PrinterConfig,
    job: PrintJob,
}

impl PrintService {
    pub fn new(
        repository: Repository,
        transport: Arc<dyn PrinterTransport>,
        fonts: FontResolver,
        printer: &PrinterConfig,
        label: &LabelConfig,
    ) -> Self {
        Self {
            repository,
            transport,
            fonts,
            layout: LabelLayout::from(label),
            printer: printer.clone(),
            job: PrintJob::new(printer, label),
        }
    }

    /// Whether labels are drawn with a TrueType font rather than the builtin one
    pub fn has_truetype_font(&self) -> bool {
        self.fonts.is_truetype()
    }

    /// Print a badge label.
    ///
    /// Without an id, a validated local badge is created first. A print log
    /// entry is written only when the label printed and the badge is local.
    pub async fn print_label(&self, payload: BadgePayload) -> AppResult<PrintOutcome> {
        let id = payload.id.clone().filter(|id| !is_blank_id(id));
        let names = payload.into_create(true)?;

        let id = match id {
            Some(id) => id,
            None => {
                let row = self.repository.badges.create(&names).await?;
                BadgeId::Int(row.id)
            }
        };

        let label = self.compose(&names).await?;
        if let Err(failure) = self.transport.print(&label.image, &self.job).await {
            tracing::warn!(
                "Print failed for '{}' (printer {}, backend {}, model {}): {}",
                label.text,
                self.job.identifier,
                self.job.backend,
                self.job.model,
                failure
            );
            return Err(failure.into());
        }

        tracing::info!("Label printed successfully for '{}'", label.text);

        if let Some(local_id) = id.as_local() {
            if self.repository.badges.find_by_id(local_id).await?.is_some() {
                self.repository.print_logs.create(local_id).await?;
            }
        }

        Ok(PrintOutcome {
            status: "success".to_string(),
            message: format!("Label printed successfully for {}", label.text),
            id: Some(id),
        })
    }

    /// Compose a label and return it as PNG without printing or storing anything
    pub async fn preview(&self, payload: BadgePayload) -> AppResult<Vec<u8>> {
        let names = payload.into_create(true)?;
        let label = self.compose(&names).await?;
        Ok(encode_png(&label.image)?)
    }

    async fn compose(&self, names: &CreateBadge) -> AppResult<ComposedLabel> {
        let fonts = self.fonts.clone();
        let layout = self.layout;
        let (first_name, last_name) = (names.first_name.clone(), names.last_name.clone());

        tokio::task::spawn_blocking(move || compose_label(&first_name, &last_name, &layout, &fonts))
            .await
            .map_err(|e| AppError::Internal(format!("Label composition failed: {}", e)))
    }

    /// Look for USB devices with the configured vendor id
    pub async fn detect_printers(&self) -> AppResult<PrinterDetection> {
        let printers = scan_usb_devices(
            Path::new(&self.printer.usb_devices_path),
            &self.printer.usb_vendor_id,
        )
        .await;

        for printer in &printers {
            tracing::info!("Found Brother printer: {}", printer);
        }

        let (status, message) = if printers.is_empty() {
            (
                "warning",
                "No Brother printers detected. Check USB connection.".to_string(),
            )
        } else {
            ("success", format!("Found {} Brother printer(s)", printers.len()))
        };

        Ok(PrinterDetection {
            status: status.to_string(),
            printers,
            message,
            current_config: self.printer.identifier(),
        })
    }
}

/// An id the front-end sends when it has none
fn is_blank_id(id: &BadgeId) -> bool {
    match id {
        BadgeId::Int(n) => *n == 0,
        BadgeId::Text(text) => text.trim().is_empty(),
    }
}

pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Read `idVendor`/`idProduct` of every device under a sysfs-style tree
async fn scan_usb_devices(root: &Path, vendor_id: &str) -> Vec<String> {
    let wanted = normalize_hex(vendor_id);
    let mut found = Vec::new();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot enumerate USB devices in {}: {}", root.display(), e);
            return found;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let dir = entry.path();
        let Ok(vendor) = tokio::fs::read_to_string(dir.join("idVendor")).await else {
            continue;
        };
        if normalize_hex(&vendor) != wanted {
            continue;
        }
        let product = tokio::fs::read_to_string(dir.join("idProduct"))
            .await
            .unwrap_or_default();
        found.push(format!(
            "usb://0x{}:0x{}",
            normalize_hex(&vendor),
            normalize_hex(&product)
        ));
    }

    found.sort();
    found.dedup();
    found
}

fn normalize_hex(value: &str) -> String {
    let value = value.trim().to_lowercase();
    let digits = value.strip_prefix("0x").unwrap_or(&value);
    format!("{:0>4}", digits)
}
