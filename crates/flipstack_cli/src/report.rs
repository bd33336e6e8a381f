//! Report output model for headless scenario runs.

use anyhow::{bail, Result};
use flipstack_stack::DebugSnapshot;
use serde::Serialize;
use std::io::Write;
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    Failed,
}

/// Machine-readable result of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: ReportStatus,
    pub failed_step_index: Option<usize>,
    pub assertion: Option<String>,
    pub message: Option<String>,
    pub elapsed_frames: u64,
    pub elapsed_ms: f64,
    /// Routes handed to the navigator, in order
    pub routes: Vec<String>,
    /// Engine state when the run stopped
    pub final_state: DebugSnapshot,
}

impl RunReport {
    pub fn passed(
        elapsed_frames: u64,
        elapsed_ms: f64,
        routes: Vec<String>,
        final_state: DebugSnapshot,
    ) -> Self {
        Self {
            status: ReportStatus::Passed,
            failed_step_index: None,
            assertion: None,
            message: None,
            elapsed_frames,
            elapsed_ms,
            routes,
            final_state,
        }
    }

    pub fn failed(
        assertion: &str,
        failed_step_index: usize,
        message: String,
        elapsed_frames: u64,
        elapsed_ms: f64,
        routes: Vec<String>,
        final_state: DebugSnapshot,
    ) -> Self {
        Self {
            status: ReportStatus::Failed,
            failed_step_index: Some(failed_step_index),
            assertion: Some(assertion.to_string()),
            message: Some(message),
            elapsed_frames,
            elapsed_ms,
            routes,
            final_state,
        }
    }

    /// Write the report as JSON to a path relative to the working directory
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        check_report_path(path)?;
        let payload = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, payload)?;
        Ok(())
    }

    pub fn write_to_writer<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)?;
        writer.write_all(payload.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn check_report_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("report path is empty");
    }
    if path.is_absolute() || path.has_root() {
        bail!("report path must be relative and must not start with a separator");
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!("report path cannot contain '..' or drive prefixes");
    }
    Ok(())
}
