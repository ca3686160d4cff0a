#![deny(missing_docs)]

//! A Rust client library for the DIAL file bucket and chat completion APIs.
//!
//! [`DialBucketClient`] moves bytes in and out of the bucket scoped to an API
//! key, and [`DialModelClient`] sends multimodal conversations to a model
//! deployment. Both exchange the value types in [`models`]: messages carry
//! [`Attachment`](models::Attachment) references produced by uploads, and
//! replies carry references to generated assets that the bucket client can
//! download.

pub mod bucket;
pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use bucket::DialBucketClient;
pub use client::DialModelClient;
pub use config::DialConfig;
pub use error::DialError;
