pub mod assembler;
pub mod instructions;
mod template;
pub mod transcript;

pub use assembler::{AssistantReply, ContextAssembler, ReplyMetadata};
pub use instructions::{Instruction, InstructionError, Preset};
pub use transcript::TranscriptFormatter;
