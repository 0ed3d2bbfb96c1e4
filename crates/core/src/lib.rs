//! # todoclaw Core
//!
//! Domain types, traits, and error definitions for the todoclaw agent.
//! This crate has **no framework dependencies**. It defines the domain model
//! that the store, provider, agent and gateway crates implement against.
//!
//! ## Design Philosophy
//!
//! Both external collaborators of the agent loop are traits here:
//! - [`Provider`]: the language model behind the model invoker
//! - [`TodoStore`]: the durable todo record store
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted providers and in-memory stores.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod todo;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use todo::{Todo, TodoStore};
pub use tool::ToolName;
