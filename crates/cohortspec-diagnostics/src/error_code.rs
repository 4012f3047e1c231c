//! Cohort specification error codes following a structured numbering system
//!
//! Error code ranges:
//! - COH0001-COH0099: Specification errors (raised while building a cohort)
//! - COH0100-COH0199: Expression errors (category expression syntax and references)
//! - COH0200-COH0299: Evaluation errors (reference evaluators)
//! - COH0300-COH0399: Study definition loading errors
//! - COH0400-COH0499: System errors (I/O, configuration, backend readiness)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a specification error (0001-0099)
    pub const fn is_specification_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is an expression error (0100-0199)
    pub const fn is_expression_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an evaluation error (0200-0299)
    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a loading error (0300-0399)
    pub const fn is_load_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COH{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Specification errors (0001-0099)
    map.insert(1, ErrorInfo::new("Unknown operation"));
    map.insert(2, ErrorInfo::new("Conflicting date bounds")
        .with_help("Use either `between` or `on_or_before`/`on_or_after`, not both"));
    map.insert(3, ErrorInfo::new("Ambiguous matching rule")
        .with_help("Remove the deprecated flag or the conflicting modern argument"));
    map.insert(4, ErrorInfo::new("Invalid code system"));
    map.insert(5, ErrorInfo::new("Unsupported pathogen"));
    map.insert(6, ErrorInfo::new("Missing required expectations")
        .with_help("Supply `return_expectations` so synthetic data can be generated"));
    map.insert(7, ErrorInfo::new("Missing matching rule")
        .with_help("Set `find_first_match_in_period` or `find_last_match_in_period`"));
    map.insert(8, ErrorInfo::new("Invalid argument"));
    map.insert(9, ErrorInfo::new("Invalid date window"));
    map.insert(10, ErrorInfo::new("Duplicate column"));
    map.insert(11, ErrorInfo::new("Undefined column")
        .with_help("Columns may only refer to columns defined before them"));
    map.insert(12, ErrorInfo::new("Invalid category definitions"));
    map.insert(13, ErrorInfo::new("Invalid expectations"));

    // Expression errors (0100-0199)
    map.insert(100, ErrorInfo::new("Unexpected token in expression"));
    map.insert(101, ErrorInfo::new("Unexpected end of expression"));
    map.insert(102, ErrorInfo::new("Invalid literal in expression"));
    map.insert(103, ErrorInfo::new("Column not available to expression"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Type mismatch"));
    map.insert(202, ErrorInfo::new("Missing column value"));

    // Loading errors (0300-0399)
    map.insert(300, ErrorInfo::new("Invalid study definition"));
    map.insert(301, ErrorInfo::new("Unknown codelist"));
    map.insert(302, ErrorInfo::new("Missing population column"));

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Backend not ready"));
    map.insert(404, ErrorInfo::new("Readiness probe failed"));

    map
});

// Specification errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);
pub const COH0006: ErrorCode = ErrorCode::new(6);
pub const COH0007: ErrorCode = ErrorCode::new(7);
pub const COH0008: ErrorCode = ErrorCode::new(8);
pub const COH0009: ErrorCode = ErrorCode::new(9);
pub const COH0010: ErrorCode = ErrorCode::new(10);
pub const COH0011: ErrorCode = ErrorCode::new(11);
pub const COH0012: ErrorCode = ErrorCode::new(12);
pub const COH0013: ErrorCode = ErrorCode::new(13);

// Expression errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);

// Evaluation errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);
pub const COH0202: ErrorCode = ErrorCode::new(202);

// Loading errors
pub const COH0300: ErrorCode = ErrorCode::new(300);
pub const COH0301: ErrorCode = ErrorCode::new(301);
pub const COH0302: ErrorCode = ErrorCode::new(302);

// System errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
pub const COH0403: ErrorCode = ErrorCode::new(403);
pub const COH0404: ErrorCode = ErrorCode::new(404);
