//! ADIF 3.1 codec.
//!
//! [`parse_adif`] tokenizes text into tagged records, [`import_adif`] turns
//! them into validated QSOs and appends them atomically, [`export_adif`]
//! writes records back out. Tags this crate does not interpret survive a
//! round trip through [`QsoDetails::extra`](crate::qso::QsoDetails::extra).

mod convert;
mod export;
mod import;
mod reader;
mod writer;

pub use convert::ExportContext;
pub use export::{ExportFilter, PROGRAM_ID, export_adif};
pub use import::{DupeTolerance, ImportOptions, ImportReport, import_adif};
pub(crate) use import::load_adif;
pub use reader::{AdifRecord, parse_adif};
pub use writer::{ADIF_VERSION, write_field, write_header, write_record};
