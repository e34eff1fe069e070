//! Record sources and CSV readers/writers.
pub mod records;

pub use records::{
    read_raw_records, read_records, write_labels, write_matrix, write_predictions, write_records,
    CsvRecordSource,
};

use crate::data_handling::Record;
use crate::error::Result;

/// Where a pipeline run gets its enriched records from.
pub trait RecordSource {
    fn load(&self) -> Result<Vec<Record>>;

    /// Short description for log lines.
    fn describe(&self) -> String;
}

/// Records already held in memory.
impl RecordSource for Vec<Record> {
    fn load(&self) -> Result<Vec<Record>> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.len())
    }
}
