pub mod handlers;
pub mod logo;
pub mod pdf;

pub use handlers::generate_report;
pub use pdf::{ReportData, ReportError, render_report};
