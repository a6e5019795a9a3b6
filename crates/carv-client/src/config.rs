//! Directory configuration.
//!
//! The program id and treasury are parsed and validated once here and then
//! passed explicitly to everything that derives addresses or builds
//! transactions. There is no process-global program id.

use std::time::Duration;

use carv_codec::{address_to_bytes, parse_program_id, METADATA_PROGRAM_ID};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;

/// Default cluster endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Commitment level requested from the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a reported confirmation status satisfies this commitment.
    pub fn is_reached_by(&self, status: &str) -> bool {
        let rank = |s: &str| match s {
            "processed" => Some(0),
            "confirmed" => Some(1),
            "finalized" => Some(2),
            _ => None,
        };
        match (rank(status), rank(self.as_str())) {
            (Some(have), Some(want)) => have >= want,
            _ => false,
        }
    }
}

/// Validated settings for one deployment of the name program.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub program_id: [u8; 32],
    pub treasury: [u8; 32],
    pub rpc_url: Url,
    pub commitment: Commitment,
    pub request_timeout: Duration,
    /// How many times `submit` polls for confirmation.
    pub confirm_attempts: u32,
    pub confirm_interval: Duration,
    /// Metadata programs tried, in order, when resolving NFT metadata.
    pub metadata_programs: Vec<[u8; 32]>,
}

impl DirectoryConfig {
    /// Create a config from Base58 program and treasury addresses.
    pub fn new(program_id: &str, treasury: &str) -> Result<Self, ClientError> {
        let program_id = parse_program_id(program_id)
            .map_err(|e| ClientError::InvalidConfiguration(format!("program_id: {e}")))?;
        let treasury = address_to_bytes(treasury)
            .map_err(|e| ClientError::InvalidConfiguration(format!("treasury: {e}")))?;
        let rpc_url = parse_url(DEFAULT_RPC_URL)?;

        Ok(Self {
            program_id,
            treasury,
            rpc_url,
            commitment: Commitment::default(),
            request_timeout: Duration::from_secs(30),
            confirm_attempts: 30,
            confirm_interval: Duration::from_millis(500),
            metadata_programs: vec![METADATA_PROGRAM_ID],
        })
    }

    pub fn with_rpc_url(mut self, url: &str) -> Result<Self, ClientError> {
        self.rpc_url = parse_url(url)?;
        Ok(self)
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Confirmation polling for `submit`. `attempts` must be at least 1.
    pub fn with_confirmation(
        mut self,
        attempts: u32,
        interval: Duration,
    ) -> Result<Self, ClientError> {
        if attempts == 0 {
            return Err(ClientError::InvalidConfiguration(
                "confirm_attempts must be at least 1".into(),
            ));
        }
        self.confirm_attempts = attempts;
        self.confirm_interval = interval;
        Ok(self)
    }

    /// Replace the metadata program candidates. Order is preserved.
    pub fn with_metadata_programs(mut self, programs: &[&str]) -> Result<Self, ClientError> {
        self.metadata_programs = programs
            .iter()
            .map(|p| {
                parse_program_id(p).map_err(|e| {
                    ClientError::InvalidConfiguration(format!("metadata_programs: {e}"))
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Load from a JSON document.
    ///
    /// ```json
    /// {
    ///   "program_id": "...",
    ///   "treasury": "...",
    ///   "rpc_url": "https://api.devnet.solana.com",
    ///   "commitment": "finalized",
    ///   "request_timeout_secs": 10,
    ///   "confirm_attempts": 20,
    ///   "confirm_interval_ms": 400,
    ///   "metadata_programs": ["metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s"]
    /// }
    /// ```
    ///
    /// Only `program_id` and `treasury` are required.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| ClientError::InvalidConfiguration(format!("config json: {e}")))?;

        let mut config = DirectoryConfig::new(&raw.program_id, &raw.treasury)?;
        if let Some(url) = raw.rpc_url {
            config = config.with_rpc_url(&url)?;
        }
        if let Some(commitment) = raw.commitment {
            config = config.with_commitment(commitment);
        }
        if let Some(secs) = raw.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        let attempts = raw.confirm_attempts.unwrap_or(config.confirm_attempts);
        let interval = raw
            .confirm_interval_ms
            .map_or(config.confirm_interval, Duration::from_millis);
        config = config.with_confirmation(attempts, interval)?;
        if let Some(programs) = raw.metadata_programs {
            let refs: Vec<&str> = programs.iter().map(String::as_str).collect();
            config = config.with_metadata_programs(&refs)?;
        }

        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    program_id: String,
    treasury: String,
    rpc_url: Option<String>,
    commitment: Option<Commitment>,
    request_timeout_secs: Option<u64>,
    confirm_attempts: Option<u32>,
    confirm_interval_ms: Option<u64>,
    metadata_programs: Option<Vec<String>>,
}

fn parse_url(url: &str) -> Result<Url, ClientError> {
    let parsed =
        Url::parse(url).map_err(|e| ClientError::InvalidConfiguration(format!("rpc_url: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ClientError::InvalidConfiguration(format!(
            "rpc_url: unsupported scheme `{other}`"
        ))),
    }
}
