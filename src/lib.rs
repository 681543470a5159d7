/// ohmage - campaign authorization and survey response projection
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `ohmage-core`: role resolution, campaign selection and the response projection engine
/// - `ohmage-report`: command-line front end that wires the engines to a facts snapshot

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
