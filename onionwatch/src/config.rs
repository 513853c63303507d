use onionwatch_core::CrawlConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct ScanSettings {
    pub db: Option<PathBuf>,
    pub timeout_s: Option<u64>,
    /// Comma-separated action names, in execution order.
    pub scans: Option<String>,
    pub rescan_hours: Option<i64>,
    pub crawl_config_dir: Option<PathBuf>,
    pub target_concurrency: Option<usize>,
    pub json_report: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub scan: Option<ScanSettings>,
}

pub fn load_config(path: Option<&Path>) -> Option<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new("onionwatch.yaml");
            if p.exists() { p.to_path_buf() } else { return None; }
        }
    };
    let s = fs::read_to_string(path).ok()?;
    serde_yaml::from_str(&s).ok()
}

/// Walk a directory tree of per-target crawl configs (one JSON document
/// each, keyed by onion). Unparseable files are reported and skipped.
pub fn load_crawl_configs(dir: &Path) -> HashMap<String, CrawlConfig> {
    let mut configs = HashMap::new();
    visit(dir, &mut configs);
    configs
}

fn visit(dir: &Path, configs: &mut HashMap<String, CrawlConfig>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read crawl config directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            visit(&path, configs);
            continue;
        }
        match fs::read_to_string(&path).map_err(anyhow::Error::from)
            .and_then(|raw| CrawlConfig::from_json(&raw))
        {
            Ok(cc) => {
                info!(onion = %cc.onion, path = %path.display(), "loaded crawl config");
                configs.insert(cc.onion.clone(), cc);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping crawl config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_configs_from_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        fs::write(
            sub.join("abc.json"),
            r#"{"onion":"abc.onion","base":"/","exclude":[],"relationships":[]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let configs = load_crawl_configs(dir.path());
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["abc.onion"].base, "/");
    }

    #[test]
    fn yaml_settings_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onionwatch.yaml");
        fs::write(&path, "scan:\n  timeout_s: 90\n  scans: \"ssh,ftp\"\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        let scan = cfg.scan.unwrap();
        assert_eq!(scan.timeout_s, Some(90));
        assert_eq!(scan.scans.as_deref(), Some("ssh,ftp"));
    }
}
