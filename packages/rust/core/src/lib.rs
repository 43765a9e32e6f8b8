//! Core pipeline orchestration for tenderfeed.
//!
//! This crate ties together the listing feed, row normalization, detail-page
//! enrichment and queue delivery into the end-to-end `run` workflow.

pub mod assembler;
pub mod delivery;
pub mod pipeline;

pub use assembler::{TenderAssembler, merge};
pub use delivery::{
    BatchOutcome, DeliveryBatcher, DeliveryReport, FailedMessage, JsonLinesSink, PreparedBatches,
    QueueMessage, QueueSink,
};
pub use pipeline::{ProgressReporter, RunReport, SilentProgress, assemble_rows, run};
