//! Shared analysis pipeline for Bento daily food logs.
//!
//! Everything in this crate is pure: it turns a request body into either a
//! finished [`analysis::AnalysisResult`] or a [`analysis::ScoredDay`] whose
//! prompt still needs a narrative. Network access lives in the API crate.

pub mod analysis;
pub mod context;
pub mod error;
pub mod payload;
pub mod scoring;
