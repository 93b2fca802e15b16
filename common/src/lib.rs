// Common library for the reel posting service: content scanning, the post
// ledger, the Meta Graph API client, and the dispatch scheduler.

pub mod config;
pub mod content;
pub mod errors;
pub mod ledger;
pub mod media;
pub mod meta;
pub mod models;
pub mod probe;
pub mod publisher;
pub mod scheduler;
