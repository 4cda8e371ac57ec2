#![forbid(unsafe_code)]

pub mod domain;
pub mod error;

pub mod chunk {
    pub mod reader;
    pub mod writer;
}

pub mod crypto {
    pub mod descbc;
    pub mod lock;
    pub mod pad;
}

pub mod formats {
    pub mod cpi;
    pub mod n27;
    pub mod ppf;
    pub mod ppi;
}

pub mod convert;
pub mod store;

// Re-exports: stable API surface
pub use convert::generate_cpis;
pub use domain::{ConversionItem, ConversionResult, InstrumentInfo, PpfData};
pub use formats::cpi::{build_encrypted_cpi, split_cpi};
pub use formats::n27::parse_n27;
pub use formats::ppf::parse_ppf;
pub use formats::ppi::build_ppi;
pub use store::{BufferSink, BufferSource};
