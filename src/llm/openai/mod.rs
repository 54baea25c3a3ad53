pub(in crate::llm) mod compat;
pub(in crate::llm) mod types;
