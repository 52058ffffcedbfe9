//! Transcript-driven SAT study planning.
//!
//! Parses OCR'd transcripts into course records, estimates baseline SAT scores,
//! finds untaken high-impact courses, and structures LLM-generated study plans.

pub mod app;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod ocr;
pub mod plan;
pub mod session;
pub mod state;
pub mod transcript;
pub mod utils;
pub mod web;
