use crate::error::CrawlError;
use serde::{Deserialize, Serialize};

/// Top-level run configuration, deserialized from the JSON file named by the sole CLI
/// argument.
///
/// ```json
/// {
///   "baseUrl": "https://my.uq.edu.au/programs-courses",
///   "outputDir": "uq_fast",
///   "workers": 64,
///   "rate": 8.0,
///   "burst": 16,
///   "fullAst": true,
///   "targets": [
///     { "year": 2025, "prefixes": ["MATH", "STAT"], "levelRange": null }
///   ],
///   "serve": { "address": "0.0.0.0", "port": 8080 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "outputDir", default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_burst")]
    pub burst: u32,
    #[serde(rename = "fullAst", default)]
    pub full_ast: bool,
    pub targets: Vec<CrawlTarget>,
    /// If present, the external HTTP view (component J) is served after the crawl
    /// completes, over `prereq_structured.json`.
    #[serde(default)]
    pub serve: Option<AddressPortInfo>,
}

/// Bind address for the external HTTP view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressPortInfo {
    pub address: String,
    pub port: u16,
}

fn default_output_dir() -> String {
    "uq_fast".to_string()
}

fn default_workers() -> usize {
    64
}

fn default_rate() -> f64 {
    8.0
}

fn default_burst() -> u32 {
    16
}

/// One year's worth of crawl seeding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTarget {
    pub year: u32,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(rename = "levelRange", default)]
    pub level_range: Option<LevelRange>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LevelRange {
    pub lo: u32,
    pub hi: u32,
}

impl CrawlConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("could not read config file {:?}: {e}", path))?;
        let cfg: CrawlConfig = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("malformed config file {:?}: {e}", path))?;
        if cfg.targets.is_empty() {
            return Err(CrawlError::Configuration(format!(
                "config at {path:?} names no crawl targets"
            ))
            .into());
        }
        if cfg.serve.is_some() && !cfg.full_ast {
            return Err(CrawlError::Configuration(
                "`serve` requires `fullAst: true` (the external view reads prereq_structured.json)"
                    .to_string(),
            )
            .into());
        }
        Ok(cfg)
    }

    pub fn concurrency(&self) -> usize {
        (self.workers / 4).clamp(6, 32)
    }

    pub fn batch_cap(&self) -> usize {
        (self.workers * 3).clamp(200, 800)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_and_batch_cap_are_clamped() {
        let mut cfg = sample_config();
        cfg.workers = 4;
        assert_eq!(cfg.concurrency(), 6);
        assert_eq!(cfg.batch_cap(), 200);

        cfg.workers = 1000;
        assert_eq!(cfg.concurrency(), 32);
        assert_eq!(cfg.batch_cap(), 800);
    }

    #[test]
    fn rejects_serve_without_full_ast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"baseUrl":"https://example.test","targets":[{"year":2025,"prefixes":[]}],"serve":{"address":"0.0.0.0","port":8080}}"#,
        )
        .unwrap();
        assert!(CrawlConfig::load(&path).is_err());
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"baseUrl":"https://example.test","targets":[{"year":2025}]}"#,
        )
        .unwrap();
        let cfg = CrawlConfig::load(&path).unwrap();
        assert_eq!(cfg.output_dir, "uq_fast");
        assert_eq!(cfg.workers, 64);
        assert!(!cfg.full_ast);
    }

    fn sample_config() -> CrawlConfig {
        CrawlConfig {
            base_url: "https://example.test".to_string(),
            output_dir: "out".to_string(),
            workers: 64,
            rate: 8.0,
            burst: 16,
            full_ast: false,
            targets: vec![CrawlTarget { year: 2025, prefixes: vec![], level_range: None }],
            serve: None,
        }
    }
}
