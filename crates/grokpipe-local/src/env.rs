//! Environment helpers and the opt-in env-file loader.

use std::path::{Path, PathBuf};

/// Trimmed value of `key`; empty or whitespace-only counts as unset.
pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn has_env(key: &str) -> bool {
    env(key).is_some()
}

/// Parse `KEY=VALUE` lines. Blank lines, `#` comments and lines without `=` are skipped;
/// an optional `export ` prefix and matching surrounding quotes are stripped.
pub fn parse_env_lines(txt: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        let v = v.trim();
        let v = ['"', '\'']
            .into_iter()
            .find_map(|q| {
                v.strip_prefix(q)
                    .and_then(|rest| rest.strip_suffix(q))
            })
            .unwrap_or(v);
        out.push((k.to_string(), v.to_string()));
    }
    out
}

/// Load `path` into the process environment without overriding variables that are
/// already set. Returns the names that were applied. A missing file is not an error.
pub fn load_env_file(path: &Path) -> std::io::Result<Vec<String>> {
    let txt = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut applied = Vec::new();
    for (k, v) in parse_env_lines(&txt) {
        if std::env::var_os(&k).is_none() {
            std::env::set_var(&k, v);
            applied.push(k);
        }
    }
    Ok(applied)
}

#[derive(Debug)]
pub struct EnvFileLoad {
    pub path: PathBuf,
    pub result: std::io::Result<Vec<String>>,
}

impl EnvFileLoad {
    /// Runs after the subscriber is installed, since loading happens before logging is
    /// configured. Key names only; values are never logged.
    pub fn log(&self) {
        match &self.result {
            Ok(keys) if !keys.is_empty() => {
                tracing::debug!(path = %self.path.display(), keys = ?keys, "loaded env file");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "could not read env file")
            }
        }
    }
}

/// Startup env loading: `GROKPIPE_ENV_FILE` first, then `./.env` unless
/// `GROKPIPE_DOTENV=0`.
pub fn load_startup_env() -> Vec<EnvFileLoad> {
    let mut paths = Vec::new();
    if let Some(p) = env("GROKPIPE_ENV_FILE") {
        paths.push(PathBuf::from(p));
    }
    if env("GROKPIPE_DOTENV").as_deref() != Some("0") {
        paths.push(PathBuf::from(".env"));
    }
    paths
        .into_iter()
        .map(|path| {
            let result = load_env_file(&path);
            EnvFileLoad { path, result }
        })
        .collect()
}
