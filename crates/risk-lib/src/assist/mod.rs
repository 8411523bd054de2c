//! Text-generation adapters
//!
//! Reminder mail drafting and the portfolio chat assistant, both backed by a
//! hosted chat-completion API. Neither adapter ever fails: a missing API key
//! or an upstream error produces a fixed fallback text.

mod chat;
mod client;
mod mail;

pub use chat::{ChatAssistant, ERROR_REPLY, UNAVAILABLE_REPLY};
pub use client::{
    ChatMessage, GroqClient, GroqConfig, LlmError, Role, TextGenerator, DEFAULT_BASE_URL,
    DEFAULT_MODEL,
};
pub use mail::{format_amount, ReminderMailer, DEFAULT_CURRENCY, DEFAULT_LANGUAGE};

pub(crate) const FEATURE_MAIL: &str = "mail";
pub(crate) const FEATURE_CHAT: &str = "chat";

pub(crate) const OUTCOME_SUCCESS: &str = "success";
pub(crate) const OUTCOME_FALLBACK: &str = "fallback";
pub(crate) const OUTCOME_ERROR: &str = "error";
