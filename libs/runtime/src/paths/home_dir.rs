use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Resolve the server home directory into an absolute path.
///
/// - `None` resolves to `<platform home>/<default_subdir>`
///   (`%APPDATA%` on Windows, `$HOME` elsewhere).
/// - A leading `~` is expanded against the platform home.
/// - Relative paths are joined onto the current working directory.
///
/// When `create` is set the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    resolve_with_base(configured, default_subdir, create, platform_home())
}

fn platform_home() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "APPDATA";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";

    env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn resolve_with_base(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    let require_home = || home.clone().ok_or_else(|| anyhow!("platform home directory is not set"));

    let resolved = match configured.as_deref().map(str::trim) {
        None | Some("") => require_home()?.join(default_subdir),
        Some("~") => require_home()?,
        Some(raw) => {
            if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
                require_home()?.join(rest)
            } else if Path::new(raw).is_absolute() {
                PathBuf::from(raw)
            } else {
                env::current_dir()
                    .context("cannot read current directory")?
                    .join(raw)
            }
        }
    };

    if create {
        std::fs::create_dir_all(&resolved)
            .with_context(|| format!("cannot create home_dir {}", resolved.display()))?;
    }

    Ok(resolved)
}
