//! HTTP plumbing shared by the provider adapters

mod client;

pub use client::{read_json, HttpClient, HttpClientBuilder};
