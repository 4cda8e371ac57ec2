// cpak_core/src/domain.rs
use serde::{Deserialize, Serialize};

/// One embedded asset (rhythm, sample set, ...) inside a pack.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PpfBlobEntry {
    pub uid: String,
    pub title: String,
    pub extension: String,
    pub icon_code: Option<String>,
    pub binary_data: Vec<u8>,
}

/// Parsed pack project file: global metadata plus assets in source order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PpfData {
    pub uid: String,
    pub title: String,
    pub blobs: Vec<PpfBlobEntry>,
}

/// Instrument identity record parsed from an .n27 file.
///
/// `full_id`, when non-empty, is the device identity string used for
/// cryptographic locking. Capacities are in bytes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentInfo {
    pub name: String,
    pub file_name: String,
    pub serial: String,
    pub full_id: String,
    pub wave_capacity: u64,
    pub param_capacity: u64,
}

/// One customer row in a batch conversion request.
#[derive(Debug, Clone)]
pub struct ConversionItem {
    pub id: i64,
    /// External customer reference used in the output filename; falls back
    /// to `id` when absent.
    pub external_ref: Option<String>,
    /// Storage reference of the customer's .n27 identity file.
    pub identity_ref: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CpiSuccess {
    pub customer_id: i64,
    pub output_ref: String,
    pub model_name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct CpiFailure {
    pub customer_id: i64,
    pub error: String,
}

#[derive(Serialize, Debug, Default)]
pub struct ConversionResult {
    pub successful: Vec<CpiSuccess>,
    pub failed: Vec<CpiFailure>,
}
