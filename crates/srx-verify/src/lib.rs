//! Two-agent verification pipeline for systematic-review extraction.
//!
//! A driver agent extracts a structured record from paper text; an
//! independent verifier reviews every decision in two rounds, patching the
//! record as it goes. Optionally two full pipelines run with the roles
//! swapped (ABBA) and a supervisor adjudicates their disagreements. The pure
//! algorithms live in `srx-core`; this crate owns the agents, the protocol,
//! and the outputs.

pub mod abba;
pub mod client;
pub mod config;
pub mod error;
pub mod external;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod reconcile;
pub mod retry;
pub mod types;
pub mod view;

pub use config::{PipelineConfig, RetryPolicy};
pub use error::{PipelineError, Result};
pub use external::{Adjudicator, Extractor, PmidResolver, ReviewLogWriter, Verifier, WorkbookWriter};
pub use pipeline::run_document;
pub use types::{
    Adjudication, AdjudicationPick, CriticalDecision, DecisionReview, DecisionStatus,
    DriverOutput, FinalDocument, Mismatch, ReviewStatus, Validation, Verification, VerifierPass,
};
