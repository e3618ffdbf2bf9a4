//! Prisma Audit Forwarder - incremental audit-log forwarding to Log Analytics.

pub mod auth;
pub mod config;
pub mod forwarder;
pub mod http;
pub mod sink;
pub mod source;
pub mod watermark;
