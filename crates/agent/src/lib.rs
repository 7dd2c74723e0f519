//! Agent Tools - the function-call surface of the car catalog engine
//!
//! The conversational orchestrator (LLM client, chat transport, reply wording) lives
//! outside this workspace. It talks to the engine only through the tools defined here:
//! - Budget and name price lookups over the current catalog snapshot
//! - Feature and company searches with configurable similarity thresholds
//! - Used-car valuation with a damage history
//! - Detail lookups that offer close names when nothing matches
//!
//! # Key Types
//!
//! - `Tool` - async trait every callable tool implements
//! - `ToolRegistry` - name-indexed registry; `ToolRegistry::car_toolkit` wires all six tools
//! - `ToolDefinition` - JSON schema declaration handed to a function-calling client
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It NEVER computes prices or decides which cars
//! match. Those are deterministic decisions made by `khodroyar-core`.

pub mod car_tools;
pub mod tools;

pub use car_tools::CarToolContext;
pub use tools::{Tool, ToolDefinition, ToolRegistry};
