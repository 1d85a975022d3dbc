//! HTTP front end for AlphaGenome-style genomic analyses.
//!
//! Requests are validated into an [`models::AnalysisRequest`], rendered into a
//! prompt for a text-generation model (or forwarded to the Python backend),
//! and answered with a uniform JSON envelope.

pub mod api_handler;
pub mod backend;
pub mod config;
pub mod errors;
pub mod gemini;
pub mod insights;
pub mod intervals;
pub mod models;
pub mod prompts;
pub mod routes;
pub mod service;
