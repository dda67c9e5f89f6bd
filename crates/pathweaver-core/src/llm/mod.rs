//! LLM integration - OpenRouter-compatible chat API
//!
//! This module provides:
//! - HTTP client for chat completions with bounded timeouts
//! - Request/response types matching the OpenAI-compatible API
//! - Model fallback with automatic retry on rate limits
//!
//! Every call made through this client resolves within the configured
//! timeout; callers layer their own fallback policy on top (see the
//! `reasoning` module consumers).

mod client;
mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use types::{ChatRequest, ChatResponse, Choice, LlmResponse, Message, MessageRole, Usage};
