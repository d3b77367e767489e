use serde::{Deserialize, Serialize};

use crate::compare::AmpComparison;
use crate::error::ErrorPayload;
use crate::report::ScanResult;

/// Schema version for output payloads.
pub const SEOSCAN_OUTPUT_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ScanOutput {
    Scan(ScanEnvelope),
    AmpCompare(AmpCompareEnvelope),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEnvelope {
    pub version: String,
    pub result: ScanResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmpCompareEnvelope {
    pub version: String,
    pub comparison: AmpComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub version: String,
    pub error: ErrorPayload,
}

impl ScanOutput {
    pub fn scan(result: ScanResult) -> Self {
        ScanOutput::Scan(ScanEnvelope {
            version: SEOSCAN_OUTPUT_VERSION.to_string(),
            result,
        })
    }

    pub fn amp_compare(comparison: AmpComparison) -> Self {
        ScanOutput::AmpCompare(AmpCompareEnvelope {
            version: SEOSCAN_OUTPUT_VERSION.to_string(),
            comparison,
        })
    }

    pub fn error(error: ErrorPayload) -> Self {
        ScanOutput::Error(ErrorOutput {
            version: SEOSCAN_OUTPUT_VERSION.to_string(),
            error,
        })
    }
}
