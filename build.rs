fn main() {
    // Release builds stamp the published version; local builds fall back to the crate version
    println!("cargo:rerun-if-env-changed=TING_RELEASE_VERSION");
    let version = std::env::var("TING_RELEASE_VERSION")
        .ok()
        .map(|v| v.trim().trim_start_matches('v').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());
    println!("cargo:rustc-env=TING_VERSION={version}");
}
