pub mod record;
pub mod source;

pub use record::{Cell, RawRow, StudentRecord};
pub use source::{read_rows, FileRoster, RosterSource, StaticRoster};
