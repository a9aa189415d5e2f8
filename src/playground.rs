//! Prompt protocol comparison.
//!
//! Each protocol (raw prompt, prompt chain, tree of thought, retrieval
//! augmented) is a [`ProtocolStrategy`]. The built-in simulated strategy
//! derives its metrics from a hash of the protocol and prompt, so the same
//! comparison always yields the same report. Real backends plug in behind
//! the same trait and are selected through `playground_mode`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PlaygroundError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Raw,
    Chain,
    Tree,
    Rag,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Protocol::Raw, Protocol::Chain, Protocol::Tree, Protocol::Rag];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Raw => "raw",
            Protocol::Chain => "chain",
            Protocol::Tree => "tree",
            Protocol::Rag => "rag",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "direct" => Ok(Protocol::Raw),
            "chain" | "chain-of-thought" | "cot" => Ok(Protocol::Chain),
            "tree" | "tree-of-thought" | "tot" => Ok(Protocol::Tree),
            "rag" | "retrieval" => Ok(Protocol::Rag),
            other => Err(PlaygroundError::InvalidRequest(format!(
                "unknown protocol '{}'",
                other
            ))),
        }
    }
}

/// Metrics for one protocol run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub protocol: Protocol,
    pub latency_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// In [0, 1].
    pub quality: f64,
}

#[async_trait]
pub trait ProtocolStrategy: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn run(&self, prompt: &str) -> Result<RunReport>;
}

/// Per-protocol cost profile used by the simulation.
struct Profile {
    input_factor: f64,
    output_factor: f64,
    base_latency_ms: u64,
    base_quality: f64,
}

fn profile(protocol: Protocol) -> Profile {
    match protocol {
        Protocol::Raw => Profile {
            input_factor: 1.0,
            output_factor: 1.0,
            base_latency_ms: 400,
            base_quality: 0.62,
        },
        Protocol::Chain => Profile {
            input_factor: 1.6,
            output_factor: 1.8,
            base_latency_ms: 900,
            base_quality: 0.74,
        },
        Protocol::Tree => Profile {
            input_factor: 2.4,
            output_factor: 2.6,
            base_latency_ms: 1600,
            base_quality: 0.81,
        },
        Protocol::Rag => Profile {
            input_factor: 1.9,
            output_factor: 1.3,
            base_latency_ms: 1100,
            base_quality: 0.78,
        },
    }
}

/// Deterministic stand-in for a real model backend.
pub struct SimulatedProtocol {
    protocol: Protocol,
}

impl SimulatedProtocol {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }
}

#[async_trait]
impl ProtocolStrategy for SimulatedProtocol {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn run(&self, prompt: &str) -> Result<RunReport> {
        Ok(simulate(self.protocol, prompt))
    }
}

fn simulate(protocol: Protocol, prompt: &str) -> RunReport {
    let digest = Sha256::new()
        .chain_update(protocol.as_str().as_bytes())
        .chain_update([0u8])
        .chain_update(prompt.as_bytes())
        .finalize();
    // Three independent draws in [0, 1) from the digest.
    let draw = |i: usize| -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[i * 8..i * 8 + 8]);
        (u64::from_le_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
    };

    let p = profile(protocol);
    let prompt_tokens = ((prompt.split_whitespace().count() as f64) * 4.0 / 3.0).ceil().max(1.0);

    let input_tokens = (prompt_tokens * p.input_factor).round() as u64;
    let output_tokens = ((80.0 + draw(0) * 160.0) * p.output_factor).round() as u64;
    let latency_ms = p.base_latency_ms + (draw(1) * 400.0) as u64 + output_tokens * 2;
    let quality = (p.base_quality + (draw(2) - 0.5) * 0.1).clamp(0.0, 1.0);

    RunReport {
        protocol,
        latency_ms,
        input_tokens,
        output_tokens,
        quality,
    }
}

/// The configured set of protocol strategies.
pub struct Playground {
    strategies: Vec<Arc<dyn ProtocolStrategy>>,
}

impl Playground {
    pub fn new(strategies: Vec<Arc<dyn ProtocolStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the strategies for a `playground_mode` setting.
    pub fn from_mode(mode: &str) -> Result<Self> {
        match mode.trim().to_lowercase().as_str() {
            "simulated" | "mock" => Ok(Self::new(
                Protocol::ALL
                    .into_iter()
                    .map(|p| Arc::new(SimulatedProtocol::new(p)) as Arc<dyn ProtocolStrategy>)
                    .collect(),
            )),
            other => Err(PlaygroundError::Config(format!(
                "unknown playground mode '{}'",
                other
            ))),
        }
    }

    /// Run `prompt` through each requested protocol (all when empty), in
    /// request order.
    pub async fn compare(&self, prompt: &str, protocols: &[Protocol]) -> Result<Vec<RunReport>> {
        if prompt.trim().is_empty() {
            return Err(PlaygroundError::InvalidRequest("prompt must not be empty".into()));
        }
        let requested: Vec<Protocol> = if protocols.is_empty() {
            Protocol::ALL.to_vec()
        } else {
            let mut unique = Vec::new();
            for p in protocols {
                if !unique.contains(p) {
                    unique.push(*p);
                }
            }
            unique
        };

        let mut reports = Vec::with_capacity(requested.len());
        for protocol in requested {
            let strategy = self
                .strategies
                .iter()
                .find(|s| s.protocol() == protocol)
                .ok_or_else(|| {
                    PlaygroundError::InvalidRequest(format!(
                        "protocol '{}' is not available",
                        protocol
                    ))
                })?;
            reports.push(strategy.run(prompt).await?);
        }
        Ok(reports)
    }
}
