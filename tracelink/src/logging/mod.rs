//! Span-correlated structured logging.
//!
//! [`Logger`] is the facade applications call. It builds a [`LogRecord`]
//! stamped with the identifiers of the caller's span and hands it to the sinks
//! in [`crate::export::sink`].

mod field;
mod level;
mod logger;
mod meta;
mod record;

pub use field::{fields_to_json, Field, FieldValue};
pub use level::Level;
pub use logger::{Logger, Mode};
pub use meta::{classify_status, Classification, RequestMeta, REQUEST_ID_HEADER};
pub use record::LogRecord;
