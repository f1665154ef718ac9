//! Simulator support for the `cardgate` binary: scenario parsing, the
//! simulated controller and the storage layout report.

pub mod scenario;
pub mod sim;

use std::path::Path;

use anyhow::Context;
use cardgate_controller::ControllerConfig;
use cardgate_core::constants::{
    MAX_IDENTITY_LENGTH, RECORD_STRIDE, STORAGE_COUNT_ADDR, STORAGE_MAGIC_ADDR,
    STORAGE_MAGIC_NUMBER, STORAGE_RECORDS_START,
};
use cardgate_storage::layout::{record_addr, required_bytes};

/// Read and validate a controller configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<ControllerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: ControllerConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Human-readable description of the byte layout for `config`.
pub fn layout_report(config: &ControllerConfig) -> Vec<String> {
    let capacity = config.capacity;
    let mut lines = vec![
        format!(
            "magic     @{STORAGE_MAGIC_ADDR:>4}  2 bytes  0x{STORAGE_MAGIC_NUMBER:04X} big-endian"
        ),
        format!("count     @{STORAGE_COUNT_ADDR:>4}  1 byte"),
        format!(
            "records   @{STORAGE_RECORDS_START:>4}  {capacity} x {RECORD_STRIDE} bytes \
             [length][active][identity, {MAX_IDENTITY_LENGTH} bytes]"
        ),
    ];
    if capacity > 0 {
        lines.push(format!(
            "last      @{:>4}",
            record_addr(capacity - 1)
        ));
    }
    lines.push(format!("required  {} bytes", required_bytes(capacity)));
    lines
}

pub fn print_layout(config: &ControllerConfig) {
    for line in layout_report(config) {
        println!("{line}");
    }
}
