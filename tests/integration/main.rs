//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! fetch classification and the full crawl cycle end-to-end.

mod crawl_tests;
mod fetch_tests;
mod support;
