//! Credeval Core Library
//!
//! Evaluates machine-generated code samples and produces a single 0-100
//! credibility score. The pipeline combines four signal bundles: the
//! generating model's token confidence, static structural metrics, static
//! semantic metrics, and the outcome of running the sample in an isolated,
//! resource-capped sandbox.
//!
//! The structural and semantic metric extractors are external tools; this
//! crate consumes their output contracts ([`metrics::StructuralMetrics`],
//! [`metrics::SemanticMetrics`]) read-only.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod sample;
pub mod sandbox;
pub mod score;

pub use error::{CredevalError, Result};
pub use metrics::{SemanticMetrics, StructuralMetrics};
pub use sample::{CodeSample, ConfidenceStats, TokenLogprob};
pub use sandbox::{ExecutionResult, ExecutionSandbox, ResourceLimits, DEFAULT_TIMEOUT};
pub use score::{credibility_score, CredibilityTier, ExecutionGate, WeightConfig};
