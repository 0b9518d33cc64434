use super::Record;

/// Writes records to an output destination.
///
/// [`Recorder::write`] outputs a record immediately. [`Recorder::store`] keeps records
/// until [`Recorder::flush`] aggregates them and writes the result tagged with `step`.
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Store the record.
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records.
    fn flush(&mut self, step: i64);
}
