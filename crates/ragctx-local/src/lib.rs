//! reqwest-backed implementations of the `ragctx-core` traits, plus the pipeline that
//! strings them together.

pub mod align;
pub mod assemble;
pub mod config;
pub mod fetch;
pub mod gate;
pub mod links;
pub mod openai_compat;
pub mod pipeline;
pub mod render;
pub mod sanitize;
pub mod search;
pub mod summarize;

pub use config::PipelineConfig;
pub use pipeline::{ContextPipeline, PipelineMode};
