pub mod convert;
pub mod reader;
pub mod rows;
pub mod writer;

pub use reader::ClickHouseReader;
pub use rows::{LogRow, MetricRow, SpanRow};
pub use writer::ClickHouseWriter;
