//! Request and response chunk types for the model service

pub mod chat;
pub mod generate;
pub mod options;
pub mod pull;

pub use chat::{ChatChunk, ChatRequest, Message, Role};
pub use generate::{ConversationContext, GenerateChunk, GenerateRequest};
pub use options::ModelOptions;
pub use pull::{format_size, PullStatus};
