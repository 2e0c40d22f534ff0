//! DLMS data model types
//!
//! The self-describing DLMS data variant plus the COSEM date/time formats.

pub mod cosem_date_time;
pub mod data_object;

pub use cosem_date_time::{ClockStatus, CosemDate, CosemDateTime, CosemTime};
pub use data_object::{decode_variable_integer, encode_variable_integer, DataObject, DataTag};
