//! Vendored path detection
//!
//! Third-party code checked into a repository inflates a pull request's
//! change count without saying anything about review effort, so those paths
//! are left out of the `changes` metric.

/// Directory names that hold vendored dependencies
const VENDOR_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    "bower_components",
    "third_party",
    "third-party",
    "thirdparty",
    "Godeps",
    "Pods",
    "Carthage",
];

/// File suffixes of minified dependency bundles
const VENDOR_SUFFIXES: &[&str] = &[".min.js", ".min.css"];

/// Whether a `/`-separated repository path points at vendored code
pub fn is_vendored(path: &str) -> bool {
    let mut components = path.split('/').filter(|c| !c.is_empty()).peekable();

    while let Some(component) = components.next() {
        let is_last = components.peek().is_none();
        if is_last {
            return VENDOR_SUFFIXES.iter().any(|s| component.ends_with(s));
        }
        if VENDOR_DIRS.contains(&component) {
            return true;
        }
    }

    false
}
