//! Asynchronous CSV reader for balance commands
//!
//! Streams commands from a CSV source in fixed-size batches, so memory stays
//! bounded regardless of input length.
//!
//! ```text
//! CSV Reader → CommandReader → Batches of BalanceCommands
//!                  ↓
//!           csv_format module
//!           (CsvCommand, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvCommand};
use crate::types::BalanceCommand;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous command reader
pub struct CommandReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> CommandReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of commands
    ///
    /// Reads up to `batch_size` records. Records that fail to parse or
    /// convert are logged and skipped.
    ///
    /// # Returns
    ///
    /// The converted commands in input order; an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<BalanceCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvCommand>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_csv_record(record) {
                    Ok(command) => batch.push(command),
                    Err(e) => warn!("skipping command: {}", e),
                },
                Some(Err(e)) => warn!("skipping unparseable CSV row: {}", e),
                None => break,
            }
        }

        batch
    }
}
