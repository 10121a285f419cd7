//! Stderr diagnostics shared by the loader and the table engine.
//!
//! Warnings are recoverable by definition: the caller continues after
//! emitting one. Hard errors go through anyhow; `error_message` only
//! decorates the text so CLI output stays uniform.

pub fn warn(msg: impl AsRef<str>) {
    eprintln!("WARN: {}", msg.as_ref());
}

pub fn error_message(msg: impl Into<String>) -> String {
    format!("loadreport: {}", msg.into())
}
