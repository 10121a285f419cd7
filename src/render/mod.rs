//! Presentation layer: self-contained HTML report.

pub mod html;

pub use html::render_html_report;
