//! Resolution of the Google service-account file used by the Dialogflow
//! assistant. A missing file never stops the service from starting.

use std::env;
use std::path::{Path, PathBuf};

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const DIALOGFLOW_ACCOUNT_ENV: &str = "DF_SERVICE_ACCOUNT_PATH";

/// Resolve `raw` against `cwd`. `None` when the value is blank or the file
/// does not exist.
pub fn resolve_credentials_path(raw: &str, cwd: &Path) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let candidate = Path::new(raw);
    let resolved = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        cwd.join(candidate)
    };

    resolved.is_file().then_some(resolved)
}

/// Point `GOOGLE_APPLICATION_CREDENTIALS` at an absolute, existing file, or
/// unset it. Call once at startup, before any worker threads read the env.
pub fn init_google_credentials() -> Option<PathBuf> {
    let raw = env::var(CREDENTIALS_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env::var(DIALOGFLOW_ACCOUNT_ENV).ok())?;

    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot read working directory; Google credentials disabled");
            env::remove_var(CREDENTIALS_ENV);
            return None;
        }
    };

    match resolve_credentials_path(&raw, &cwd) {
        Some(path) => {
            env::set_var(CREDENTIALS_ENV, &path);
            tracing::info!(path = %path.display(), "Google credentials configured");
            Some(path)
        }
        None => {
            tracing::warn!(
                path = %raw,
                "Google service account file not found; chat assistant will be unavailable"
            );
            env::remove_var(CREDENTIALS_ENV);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn relative_paths_resolve_against_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sa.json"), "{}").unwrap();

        let resolved = resolve_credentials_path("sa.json", dir.path()).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, dir.path().join("sa.json"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sa.json");
        fs::write(&file, "{}").unwrap();

        let elsewhere = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_credentials_path(file.to_str().unwrap(), elsewhere.path()),
            Some(file)
        );
    }

    #[test]
    fn missing_or_blank_paths_resolve_to_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_credentials_path("missing.json", dir.path()), None);
        assert_eq!(resolve_credentials_path("   ", dir.path()), None);
        assert_eq!(resolve_credentials_path(".", dir.path()), None);
    }
}
