//! One-time loading of the platform's native compute support libraries.
//!
//! Loading happens at most once per process, on the first blur call. A
//! load failure is fatal only when the current runtime identity is one
//! where the libraries are known to be required; on any other identity
//! the embedding host is assumed to have preloaded them, the redundant
//! explicit load is tolerated, and a warning is logged.
//!
//! The runtime identity is an explicit configuration value read from the
//! [`RUNTIME_ENV`] environment variable, defaulting to
//! [`DEFAULT_RUNTIME`]. Hosts that preload the support libraries set it
//! to their own identity string.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::{BlurError, BlurResult};

/// Environment variable naming the current runtime identity.
pub const RUNTIME_ENV: &str = "FOGGER_RUNTIME";

/// Identity assumed when [`RUNTIME_ENV`] is unset.
pub const DEFAULT_RUNTIME: &str = "host";

/// Runtime identities on which a support-library load failure is fatal.
pub const EXPECTED_RUNTIMES: &[&str] = &["host"];

/// Native libraries backing the GPU kernels. The CPU backend needs none,
/// so builds without the `wgpu` feature load nothing.
#[cfg(all(feature = "wgpu", target_os = "linux"))]
const SUPPORT_LIBRARIES: &[&str] = &["libvulkan.so.1"];
#[cfg(all(feature = "wgpu", target_os = "windows"))]
const SUPPORT_LIBRARIES: &[&str] = &["vulkan-1.dll"];
#[cfg(all(feature = "wgpu", target_os = "macos"))]
const SUPPORT_LIBRARIES: &[&str] = &["libMoltenVK.dylib"];
#[cfg(any(
    not(feature = "wgpu"),
    not(any(target_os = "linux", target_os = "windows", target_os = "macos"))
))]
const SUPPORT_LIBRARIES: &[&str] = &[];

/// Process-wide load state: `None` when usable, `Some((runtime, reason))`
/// when the load failed fatally.
static SUPPORT: OnceLock<Option<(String, String)>> = OnceLock::new();

/// Ensure the native support libraries are loaded.
///
/// The load runs once per process; every call after a fatal failure
/// returns the same [`BlurError::NativeLoadFailure`].
pub fn ensure_loaded() -> BlurResult<()> {
    let failure = SUPPORT.get_or_init(|| resolve(&runtime_identity(), load_support_libraries()));
    match failure {
        None => Ok(()),
        Some((runtime, reason)) => Err(BlurError::NativeLoadFailure {
            runtime: runtime.clone(),
            reason: reason.clone(),
        }),
    }
}

/// The configured runtime identity.
pub fn runtime_identity() -> String {
    std::env::var(RUNTIME_ENV).unwrap_or_else(|_| DEFAULT_RUNTIME.to_string())
}

fn load_support_libraries() -> Result<(), String> {
    for name in SUPPORT_LIBRARIES {
        // SAFETY: these are plain driver loader libraries; their
        // initializers have no preconditions visible from Rust.
        let library = unsafe { libloading::Library::new(name) }.map_err(|e| format!("{name}: {e}"))?;
        // Once loaded the library stays resident for the life of the
        // process, matching the load-once semantics of the state above.
        std::mem::forget(library);
        debug!(library = name, "loaded native compute support library");
    }
    Ok(())
}

/// Decide what a load result means under the given runtime identity.
///
/// Pure so that both policy branches can be tested without touching
/// process-wide state or real libraries.
fn resolve(identity: &str, load: Result<(), String>) -> Option<(String, String)> {
    match load {
        Ok(()) => None,
        Err(reason) if EXPECTED_RUNTIMES.contains(&identity) => Some((identity.to_string(), reason)),
        Err(reason) => {
            // The embedding host preloads the support libraries on other
            // runtimes; the redundant explicit load may fail.
            warn!(
                runtime = identity,
                reason, "native support load failed, tolerated on this runtime"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_load_is_usable() {
        assert!(resolve("host", Ok(())).is_none());
        assert!(resolve("managed-preload", Ok(())).is_none());
    }

    #[test]
    fn test_load_failure_on_expected_runtime_is_fatal() {
        let failure = resolve("host", Err("libfoo: not found".into()));
        let (runtime, reason) = failure.expect("must be fatal on an expected runtime");
        assert_eq!(runtime, "host");
        assert!(reason.contains("libfoo"));
    }

    #[test]
    fn test_load_failure_on_other_runtime_is_tolerated() {
        assert!(resolve("managed-preload", Err("libfoo: not found".into())).is_none());
    }

    #[test]
    fn test_ensure_loaded_is_idempotent() {
        let first = ensure_loaded();
        let second = ensure_loaded();
        assert_eq!(first.is_ok(), second.is_ok());
    }
}
