//! Integration tests for the wirespec workspace.
//!
//! This crate carries no library code of its own; the end-to-end scenarios
//! live under `tests/` and exercise the public APIs of the workspace
//! crates together.
