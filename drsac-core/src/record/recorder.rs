use super::Record;

/// Destination of [`Record`]s.
pub trait Recorder {
    /// Writes a record immediately.
    fn write(&mut self, record: Record);

    /// Stores a record to be written at the next [`Recorder::flush`].
    fn store(&mut self, record: Record) {
        self.write(record);
    }

    /// Writes the stored records, tagging them with `step`.
    fn flush(&mut self, _step: i64) {}
}
