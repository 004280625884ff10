//! Test Module
//!
//! ## Test Categories
//! - `supervisor_tests`: chat pipeline, analysis and mind maps over scripted actors
//! - `database_tests`: SQLite session store
//! - `http_tests`: HTTP routes, status codes and SSE framing

pub mod support;

mod database_tests;
