//! Common test utilities for integration tests.
//!
//! This module provides reusable mock adapters, scripted job responses and
//! credential fixtures.
//!
//! # Example
//!
//! ```ignore
//! mod common;
//! use common::*;
//!
//! let api = ScriptedJobApi::new();
//! api.script("J1", vec![running(10.0), succeeded(json!("ok"))]);
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Yield until `condition` holds.
pub async fn until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

/// Counts callback invocations.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
