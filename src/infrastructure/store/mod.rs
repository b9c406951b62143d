pub mod json_log;

pub use json_log::JsonlRecordStore;
