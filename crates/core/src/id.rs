//! Prefixed identifiers

use uuid::Uuid;

pub const TRANSACTION: &str = "TX";
pub const AGENT: &str = "AGT";
pub const ALERT: &str = "ALRT";
pub const ASSESSMENT: &str = "RA";
pub const AUDIT: &str = "AUD";

/// Generate a new id such as `TX-6f1c...`
pub fn generate(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}
