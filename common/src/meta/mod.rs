// Thin Meta Graph API adapter: Instagram media containers and Facebook page
// video endpoints

pub mod client;

pub use client::MetaClient;
