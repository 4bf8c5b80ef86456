//! HTTP transport for http-loadgen
//!
//! Provides [`HttpApiClient`], the reqwest implementation of the core
//! `ApiClient` trait.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod http;

pub use http::HttpApiClient;
