//! Report composition and rendering.

pub mod generator;
pub mod markdown;
pub mod slack;

pub use generator::{generate_report, generate_report_at, report_title, Report};
pub use markdown::render_markdown;
pub use slack::slack_payload;
