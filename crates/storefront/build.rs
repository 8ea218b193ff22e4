//! Build script for storefront crate.
//!
//! Generates content-based hashes for static assets (CSS and JS) so that
//! templates can reference them with a cache-busting `?v=` parameter.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:warning=CARGO_MANIFEST_DIR is not set");
        println!("cargo:rustc-env=CSS_HASH=");
        println!("cargo:rustc-env=JS_HASH=");
        return;
    };
    let root = Path::new(&manifest_dir);

    hash_asset(&root.join("static/css/main.css"), "CSS_HASH");
    hash_asset(&root.join("static/js/notify.js"), "JS_HASH");
}

/// Hash a static file and expose the first 8 hex chars as `var`.
///
/// Sets the variable for use with `env!(var)`.
fn hash_asset(path: &Path, var: &str) {
    // Tell Cargo to rerun if the asset changes
    println!("cargo:rerun-if-changed={}", path.display());

    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", path.display());
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = format!("{:x}", hasher.finalize());
    let short_hash = hash.get(..8).unwrap_or(&hash);

    println!("cargo:rustc-env={var}={short_hash}");
}
