//! Build script for dairy-ration
//!
//! Stamps the binaries with a build counter, the compile time, the cargo
//! profile and the target triple.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=src");

    // Counter lives in OUT_DIR; `cargo clean` resets it
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let counter = out_dir.join("build_counter");

    let previous: u64 = fs::read_to_string(&counter)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build = previous + 1;
    fs::write(&counter, build.to_string()).expect("build counter is writable");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=DAIRY_RATION_BUILD_NUMBER={}", build);
    println!("cargo:rustc-env=DAIRY_RATION_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=DAIRY_RATION_BUILD_PROFILE={}", profile);
    println!("cargo:rustc-env=DAIRY_RATION_BUILD_TARGET={}", target);
}
