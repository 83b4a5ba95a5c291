//! Live Net Promoter Score poll: vote submission, a live vote feed per poll
//! session, and the NPS aggregation behind the display screen.

pub mod commands;
pub mod config;
pub mod db;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod tasks;
pub mod voting;
