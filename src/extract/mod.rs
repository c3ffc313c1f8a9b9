pub mod deadline;
pub mod record;

pub use deadline::extract_deadline;
pub use record::extract_record;
