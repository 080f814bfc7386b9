use std::path::PathBuf;
use std::sync::OnceLock;

static REFCODE_HOME: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Store the home override from the CLI flag.
/// Falls through to `REFCODE_HOME` env var if `None`.
pub fn init(home: Option<PathBuf>) {
    let _ = REFCODE_HOME.set(home);
}

fn refcode_home() -> Option<PathBuf> {
    REFCODE_HOME.get().and_then(|p| p.clone()).or_else(|| {
        std::env::var("REFCODE_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

/// Resolve one of the base directories: `<home>/<sub>` when a home
/// override is set, otherwise `$<xdg_var>/refcode`, otherwise `fallback()`
/// joined with `refcode`.
fn resolve(
    sub: &str,
    xdg_var: &str,
    fallback: impl FnOnce() -> anyhow::Result<PathBuf>,
) -> anyhow::Result<PathBuf> {
    if let Some(home) = refcode_home() {
        return Ok(home.join(sub));
    }

    let base = match std::env::var(xdg_var) {
        Ok(val) if !val.is_empty() => PathBuf::from(val),
        _ => fallback()?,
    };

    Ok(base.join("refcode"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| anyhow::anyhow!("could not determine home directory"))
}

pub fn data_dir() -> anyhow::Result<PathBuf> {
    resolve("data", "XDG_DATA_HOME", || {
        Ok(home_dir()?.join(".local").join("share"))
    })
}

pub fn runtime_dir() -> anyhow::Result<PathBuf> {
    resolve("runtime", "XDG_RUNTIME_DIR", || Ok(std::env::temp_dir()))
}

pub fn config_dir() -> anyhow::Result<PathBuf> {
    resolve("config", "XDG_CONFIG_HOME", || Ok(home_dir()?.join(".config")))
}

pub fn socket_path() -> anyhow::Result<PathBuf> {
    Ok(runtime_dir()?.join("refcode.sock"))
}

pub fn pid_path() -> anyhow::Result<PathBuf> {
    Ok(runtime_dir()?.join("refcode.pid"))
}

pub fn ensure_dirs() -> anyhow::Result<()> {
    for dir in [data_dir()?, runtime_dir()?] {
        tracing::debug!(path = %dir.display(), "ensuring directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}
