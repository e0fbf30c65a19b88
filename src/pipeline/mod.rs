//! Stage implementations and their shared plumbing.
//!
//! Data flows through the submodules in run order:
//!
//! ```text
//! extract ──▶ sanitize ──▶ (prompt) ──▶ stage ──▶ parse
//!    │                                    ▲
//!    └─▶ encode ──(page image)────────────┘
//!                             websearch ──┘ (reference material)
//! ```
//!
//! `extract` and `encode` handle the document side (text layer, rendered
//! first page); `sanitize` prepares audit input; `stage` is the one
//! "call model, parse result" executor every LLM stage goes through;
//! `parse` recovers structured JSON from raw model text; `visual` composes
//! render + encode + stage into the consistency check; `websearch` gathers
//! optional real-question material.

pub mod encode;
pub mod extract;
pub mod parse;
pub mod sanitize;
pub mod stage;
pub mod visual;
pub mod websearch;
