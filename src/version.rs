// Package identity baked in at build time

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// "name vX.Y.Z", logged at startup.
pub fn banner() -> String {
    format!("{} v{}", NAME, VERSION)
}
