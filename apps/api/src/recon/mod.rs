//! Response-to-spreadsheet reconstruction: turning an unstructured model
//! response into tabular sheets, with a strict cascade of fallbacks.

pub mod csv;
pub mod decode;
pub mod sheets;
pub mod tables;
