//! Configuration file support for ferro-vep.
//!
//! Every setting has a default, so an empty file (or no file) is valid.
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoints]
//! liftover_url = "https://rest.ensembl.org"
//! vep_url = "http://rest.ensembl.org"
//! timeout_seconds = 30
//!
//! [retry]
//! max_attempts = 10
//! backoff_base_ms = 250
//!
//! [cache]
//! path = "vep_cache.json"
//!
//! [lookup]
//! gene_regions = "gene_regions.tsv"
//! transcripts = "transcripts.tsv"
//!
//! [query]
//! canonical = "1"
//! variant_class = "1"
//! ```
//!
//! # Config File Locations
//!
//! Configuration is searched in this order (first found wins):
//! 1. `.ferro-vep.toml` in current directory
//! 2. `~/.config/ferro/vep.toml`
//!
//! CLI flags take precedence over config file settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::VepError;
use crate::extract::ExtractionConfig;

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_NAME: &str = ".ferro-vep.toml";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VepConfig {
    /// Remote service endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// Retry and backoff
    #[serde(default)]
    pub retry: RetryConfig,
    /// Annotation cache file
    #[serde(default)]
    pub cache: CacheConfig,
    /// Gene-region and transcript lookup files
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Flags appended to every annotation request
    #[serde(default = "default_query")]
    pub query: BTreeMap<String, String>,
    /// Which response fields become output columns
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Output table settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Remote endpoints
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the coordinate-mapping service
    pub liftover_url: String,
    /// Base URL of the annotation service
    pub vep_url: String,
    /// Species path segment (default: "human")
    pub species: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
}

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request (default: 10)
    pub max_attempts: u32,
    /// First backoff delay in milliseconds; 0 disables sleeping
    pub backoff_base_ms: u64,
    /// Backoff ceiling in milliseconds
    pub backoff_max_ms: u64,
    /// Randomize delays
    pub jitter: bool,
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// JSON cache file (default: "vep_cache.json")
    pub path: PathBuf,
}

/// Lookup table paths
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Gene-region TSV: chrom, start, end, exon, gene-info
    pub gene_regions: Option<PathBuf>,
    /// Transcript TSV: gene, transcript-id, refseq-id
    pub transcripts: Option<PathBuf>,
}

/// Output table configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Field delimiter, a single ASCII character (default: ",")
    pub delimiter: String,
    /// Rows between partial snapshots (default: 1000)
    pub checkpoint_interval: usize,
    /// Uppercase annotation column names
    pub uppercase_columns: bool,
    /// Column holding the derived clinical-significance class
    pub clinical_significance_column: String,
}

impl Default for VepConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            lookup: LookupConfig::default(),
            query: default_query(),
            extraction: ExtractionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            liftover_url: "https://rest.ensembl.org".to_string(),
            vep_url: "http://rest.ensembl.org".to_string(),
            species: "human".to_string(),
            user_agent: format!("ferro-vep/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 30,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base_ms: 250,
            backoff_max_ms: 10_000,
            jitter: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vep_cache.json"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            checkpoint_interval: 1000,
            uppercase_columns: true,
            clinical_significance_column: "CLIN_SIG_CLASS".to_string(),
        }
    }
}

fn default_query() -> BTreeMap<String, String> {
    ["variant_class", "canonical", "domains", "pubmed", "numbers"]
        .iter()
        .map(|flag| (flag.to_string(), "1".to_string()))
        .collect()
}

impl OutputConfig {
    /// The delimiter as a byte for the csv crate.
    pub fn delimiter_byte(&self) -> Result<u8, VepError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            // Allow a literal "\t" in TOML files written by hand
            _ if self.delimiter == "\\t" => Ok(b'\t'),
            _ => Err(VepError::Config {
                msg: format!(
                    "Delimiter must be a single ASCII character, got '{}'",
                    self.delimiter
                ),
            }),
        }
    }
}

impl VepConfig {
    /// Load configuration from the default locations, or defaults if none exist.
    ///
    /// A config file that exists but fails to parse is an error.
    pub fn load() -> Result<Self, VepError> {
        match Self::discover() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// First existing config file in the search order.
    pub fn discover() -> Option<PathBuf> {
        let cwd_config = PathBuf::from(LOCAL_CONFIG_NAME);
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        let home_config = dirs_home()?
            .join(".config")
            .join("ferro")
            .join("vep.toml");
        home_config.exists().then_some(home_config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, VepError> {
        let content = std::fs::read_to_string(path).map_err(|e| VepError::Config {
            msg: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML content.
    pub fn parse(content: &str) -> Result<Self, VepError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), VepError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VepError> {
        let fail = |msg: String| Err(VepError::Config { msg });

        for (name, value) in [
            ("liftover_url", &self.endpoints.liftover_url),
            ("vep_url", &self.endpoints.vep_url),
        ] {
            if let Err(e) = Url::parse(value) {
                return fail(format!("Invalid {} '{}': {}", name, value, e));
            }
        }
        if self.endpoints.species.trim().is_empty() {
            return fail("Species must not be empty".to_string());
        }
        if self.endpoints.timeout_seconds == 0 {
            return fail("Timeout must be greater than 0".to_string());
        }

        if self.retry.max_attempts == 0 {
            return fail("Retry max_attempts must be at least 1".to_string());
        }
        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            return fail(format!(
                "backoff_max_ms ({}) is below backoff_base_ms ({})",
                self.retry.backoff_max_ms, self.retry.backoff_base_ms
            ));
        }

        if self.output.checkpoint_interval == 0 {
            return fail("Checkpoint interval must be greater than 0".to_string());
        }
        if self.output.clinical_significance_column.trim().is_empty() {
            return fail("Clinical significance column name must not be empty".to_string());
        }
        self.output.delimiter_byte()?;

        for path in [&self.lookup.gene_regions, &self.lookup.transcripts]
            .into_iter()
            .flatten()
        {
            if !path.exists() {
                return fail(format!("Lookup file does not exist: {}", path.display()));
            }
        }

        Ok(())
    }
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
