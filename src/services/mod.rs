pub mod content;
pub mod error;
pub mod llm;
pub mod setup;
pub mod workflow;
