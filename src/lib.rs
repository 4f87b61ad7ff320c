//! Car insurance bot: document photos in, insurance policy out.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extraction;
pub mod llm;
pub mod policy;
