//! Core library for the `blowhole` CLI.
//!
//! This crate provides the building blocks used by the binary: work
//! partitioning, concurrent request dispatch, response classification and
//! aggregation, and the coordinator/agent protocol that lets several
//! processes run one logical load test. The primary user-facing interface
//! is the `blowhole` command-line application.
pub mod app;
pub mod args;
pub mod config;
pub mod distributed;
pub mod domain;
pub mod error;
pub mod http;
pub mod metrics;
pub mod workload;
