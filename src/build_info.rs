//! Build information module
//!
//! What produced a report: package version, build counter, compile time,
//! profile and target, plus the feed library schema the binary expects.

use serde::Serialize;

use crate::db::migrations::SCHEMA_VERSION;

/// Build number, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("DAIRY_RATION_BUILD_NUMBER") {
    Some(s) => match parse_u64(s) {
        Some(n) => n,
        None => 0,
    },
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("DAIRY_RATION_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// Cargo profile, `debug` or `release`
pub const BUILD_PROFILE: &str = match option_env!("DAIRY_RATION_BUILD_PROFILE") {
    Some(s) => s,
    None => "unknown",
};

pub const BUILD_TARGET: &str = match option_env!("DAIRY_RATION_BUILD_TARGET") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

const fn parse_u64(s: &str) -> Option<u64> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            return None;
        }
        result = result * 10 + (b - b'0') as u64;
        i += 1;
    }
    Some(result)
}

/// Build information attached to report output
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub profile: &'static str,
    pub target: &'static str,
    /// Feed library schema version this build reads
    pub feed_library_schema: i32,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            profile: BUILD_PROFILE,
            target: BUILD_TARGET,
            feed_library_schema: SCHEMA_VERSION,
        }
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    let info = BuildInfo::current();
    eprintln!("===============================================");
    eprintln!("  Dairy Ration nutrient intake");
    eprintln!("  Version: {} | Build: {}", info.version, info.build_number);
    eprintln!("  Compiled: {} ({}, {})", info.build_timestamp, info.profile, info.target);
    eprintln!("  Feed library schema: v{}", info.feed_library_schema);
    eprintln!("===============================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("42"), Some(42));
        assert_eq!(parse_u64("4a"), None);
        assert_eq!(parse_u64(""), None);
    }

    #[test]
    fn test_current_uses_package_metadata() {
        let info = BuildInfo::current();
        assert_eq!(info.name, "dairy-ration");
        assert_eq!(info.version, VERSION);
        assert_eq!(info.feed_library_schema, SCHEMA_VERSION);
    }

    #[test]
    fn test_build_metadata_is_embedded() {
        let info = BuildInfo::current();
        assert!(info.build_number >= 1);
        assert_ne!(info.build_timestamp, "unknown");
        assert!(matches!(info.profile, "debug" | "release"));
        assert_ne!(info.target, "unknown");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["feed_library_schema"], SCHEMA_VERSION);
    }
}
