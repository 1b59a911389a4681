// Copyright 2025 Cowboy AI, LLC.

//! Non-fatal configuration warnings
//!
//! Warnings are logged through `tracing` at the point they occur and kept
//! in a bounded log so callers can inspect them afterwards.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DiagnosticKind {
    /// `extend` registered over a name that was already taken
    ExtendOverRegistered,
    /// `parent()` named a member no ancestor provides
    MissingParentMember,
}

/// A recorded warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    /// Kind of warning
    pub kind: DiagnosticKind,
    /// Class the warning is about
    pub class: String,
    /// Member involved, if any
    pub member: Option<String>,
    /// Human-readable description
    pub message: String,
    /// When it was recorded
    pub recorded_at: DateTime<Utc>,
}

impl Diagnostic {
    /// Create a diagnostic stamped with the current time
    pub fn new(
        kind: DiagnosticKind,
        class: impl Into<String>,
        member: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            class: class.into(),
            member,
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Bounded log of diagnostics; the oldest entry is dropped when full
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl DiagnosticLog {
    /// Create a log holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Record a diagnostic
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.iter().cloned().collect()
    }

    /// Remove and return all entries
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    /// Number of entries of a kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
