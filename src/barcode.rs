// src/barcode.rs
use std::fmt;

use crate::layout::LayoutRepair;
use crate::types::{CharPolicy, ScanContext};

/// Keeps only the characters `policy` allows. An empty result means the
/// code carries no meaningful content and must be ignored.
pub fn sanitize(input: &str, policy: CharPolicy) -> String {
    let out: String = match policy {
        CharPolicy::DigitsOnly => input.chars().filter(|c| c.is_ascii_digit()).collect(),
        CharPolicy::General => input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect(),
    };
    // separators alone are noise
    if out.chars().any(|c| c.is_ascii_alphanumeric()) {
        out
    } else {
        String::new()
    }
}

/// A scanned code that went through layout repair and sanitization. Only
/// `CodeCleaner::clean` builds one, so `code` always satisfies its policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedCode {
    raw: String,
    code: String,
    context: ScanContext,
}

impl CleanedCode {
    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn context(&self) -> ScanContext {
        self.context
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Display for CleanedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// Layout repair, accent fold and sanitization in one pass, plus the
/// minimum length consumers insist on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeCleaner {
    repair: LayoutRepair,
    min_len: usize,
}

impl Default for CodeCleaner {
    fn default() -> Self {
        Self::new(LayoutRepair::default(), 2)
    }
}

impl CodeCleaner {
    pub fn new(repair: LayoutRepair, min_len: usize) -> Self {
        Self { repair, min_len }
    }

    pub fn repair(&self) -> &LayoutRepair {
        &self.repair
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    // no length check; "" means invalid
    pub fn clean_str(&self, raw: &str, policy: CharPolicy) -> String {
        let repaired = self.repair.repair(raw.trim());
        sanitize(&repaired, policy)
    }

    /// Cleans `raw` with the policy of `context`. `None` for noise: nothing
    /// meaningful left, or shorter than the minimum length.
    pub fn clean(&self, raw: &str, context: ScanContext) -> Option<CleanedCode> {
        let raw = raw.trim();
        let code = self.clean_str(raw, context.policy());
        if code.is_empty() || code.chars().count() < self.min_len {
            tracing::debug!(raw = %raw, cleaned = %code, %context, "scanned code rejected");
            return None;
        }
        Some(CleanedCode {
            raw: raw.to_string(),
            code,
            context,
        })
    }

    /// Stored SKUs predate sanitization; compare both their cleaned and raw
    /// forms against the scanned code.
    pub fn sku_matches(&self, stored_sku: &str, code: &str) -> bool {
        stored_sku == code || self.clean_str(stored_sku, CharPolicy::General) == code
    }
}
