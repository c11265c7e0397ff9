/// Semicolon-delimited result and error ledgers.
///
/// Both files are append-only so an interrupted run can be resumed without
/// losing the lines already written. Lines are flushed one at a time; a
/// crash mid-run leaves every completed address on disk.
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::fs::{File, OpenOptions};
use std::io::Write;

pub struct ReportWriter {
    result_file: File,
    error_file: File,
    /// Multi-asset runs carry the asset id as a fourth column.
    include_asset_id: bool,
}

impl ReportWriter {
    pub fn open(result_path: &str, error_path: &str, include_asset_id: bool) -> Result<Self> {
        let result_file = append_file(result_path)?;
        let error_file = append_file(error_path)?;

        Ok(Self {
            result_file,
            error_file,
            include_asset_id,
        })
    }

    pub fn write_balance(
        &mut self,
        client_id: &str,
        address: &str,
        amount: Decimal,
        asset_id: &str,
    ) -> Result<()> {
        let line = if self.include_asset_id {
            format!("{};{};{};{}\n", client_id, address, amount, asset_id)
        } else {
            format!("{};{};{}\n", client_id, address, amount)
        };

        self.result_file
            .write_all(line.as_bytes())
            .context("Failed to append to the result file")?;
        self.result_file.flush().ok();

        Ok(())
    }

    pub fn write_error(&mut self, client_id: &str, address: &str, error_text: &str) -> Result<()> {
        // Semicolons inside the error text would shift the columns.
        let sanitized = error_text.replace(';', ",");
        let line = format!(
            "{};{};{};{}\n",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            client_id,
            address,
            sanitized
        );

        self.error_file
            .write_all(line.as_bytes())
            .context("Failed to append to the error file")?;
        self.error_file.flush().ok();

        Ok(())
    }
}

fn append_file(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open report file: {}", path))
}
