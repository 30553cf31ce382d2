//! Data model for incremental-build collapsing.
//!
//! Pages carry comparable content signatures; the collapser partitions them
//! into runs; reports record what happened to each document.

mod page;
mod report;
mod run;
mod signature;

pub use page::Page;
pub use report::{
    BatchReport, DocumentFailure, DocumentOutcome, DocumentReport, FailureKind, PageIssue,
};
pub use run::{is_partition, Run};
pub use signature::{digest64, ContentSignature, Primitive, PrimitiveKind, SignatureState};
