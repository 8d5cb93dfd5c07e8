//! Default locations of the contract and execution context files.

use std::path::{Path, PathBuf};

/// Project contract file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".mcpd.toml";

pub const DEFAULT_RUNTIME_FILE_NAME: &str = "secrets.dev.toml";

pub const CONFIG_FILE_ENV: &str = "MCPD_CONFIG_FILE";
pub const RUNTIME_FILE_ENV: &str = "MCPD_RUNTIME_FILE";

/// `$XDG_CONFIG_HOME/mcpd`, falling back to `~/.config/mcpd`.
pub fn user_config_dir() -> anyhow::Result<PathBuf> {
    let xdg = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from);
    resolve_user_config_dir(xdg.as_deref(), dirs::home_dir().as_deref())
}

fn resolve_user_config_dir(xdg: Option<&Path>, home: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(xdg) = xdg
        && xdg.is_absolute()
    {
        return Ok(xdg.join("mcpd"));
    }
    let home = home.ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("mcpd"))
}

/// Default execution context path.
pub fn default_runtime_file() -> anyhow::Result<PathBuf> {
    Ok(user_config_dir()?.join(DEFAULT_RUNTIME_FILE_NAME))
}

/// Whether two paths refer to the same file, comparing canonical forms when
/// both exist.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_takes_precedence() {
        let dir = resolve_user_config_dir(Some(Path::new("/xdg")), Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/xdg/mcpd"));
    }

    #[test]
    fn relative_xdg_is_ignored() {
        let dir = resolve_user_config_dir(Some(Path::new("rel")), Some(Path::new("/home/u")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.config/mcpd"));
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(resolve_user_config_dir(None, None).is_err());
    }
}
