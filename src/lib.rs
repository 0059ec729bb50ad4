//! Hobby Guide: a conversational hobby recommender backed by a hosted LLM.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
