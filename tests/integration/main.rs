//! End-to-end tests against a mock catalog server

mod crawl_tests;
mod fetch_tests;
