//! Bounded index update batches

use landro_index::FileInfo;
use tracing::debug;

use crate::errors::Result;

/// Accumulates replacement records until a count or size ceiling is hit
#[derive(Debug)]
pub struct UpdateBatch {
    files: Vec<FileInfo>,
    size_bytes: usize,
    max_files: usize,
    max_bytes: usize,
}

impl UpdateBatch {
    pub fn new(max_files: usize, max_bytes: usize) -> Self {
        Self {
            files: Vec::with_capacity(max_files.min(1024)),
            size_bytes: 0,
            max_files,
            max_bytes,
        }
    }

    pub fn append(&mut self, file: FileInfo) {
        self.size_bytes += file.size_estimate();
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Whether either ceiling has been reached
    pub fn is_full(&self) -> bool {
        self.files.len() >= self.max_files || self.size_bytes >= self.max_bytes
    }

    /// Hand the pending records to `sink` and reset; no-op when empty
    pub fn flush<F>(&mut self, sink: &mut F) -> Result<()>
    where
        F: FnMut(Vec<FileInfo>) -> landro_index::Result<()>,
    {
        if self.files.is_empty() {
            return Ok(());
        }

        debug!(
            "Flushing index batch: {} records, ~{} bytes",
            self.files.len(),
            self.size_bytes
        );
        let files = std::mem::take(&mut self.files);
        self.size_bytes = 0;
        sink(files)?;
        Ok(())
    }

    /// Flush only if a ceiling has been reached
    pub fn flush_if_full<F>(&mut self, sink: &mut F) -> Result<()>
    where
        F: FnMut(Vec<FileInfo>) -> landro_index::Result<()>,
    {
        if self.is_full() {
            self.flush(sink)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landro_index::{FileType, IndexError};
    use std::cell::RefCell;

    fn file(name: &str) -> FileInfo {
        FileInfo::new(name, FileType::File)
    }

    #[test]
    fn test_count_ceiling() {
        let mut batch = UpdateBatch::new(3, usize::MAX);
        let mut flushed: Vec<usize> = Vec::new();
        let mut sink = |files: Vec<FileInfo>| -> landro_index::Result<()> {
            flushed.push(files.len());
            Ok(())
        };

        for i in 0..7 {
            batch.append(file(&format!("f{}", i)));
            batch.flush_if_full(&mut sink).unwrap();
        }
        batch.flush(&mut sink).unwrap();

        assert_eq!(flushed, vec![3, 3, 1]);
        assert!(batch.is_empty());
        assert_eq!(batch.size_bytes(), 0);
    }

    #[test]
    fn test_byte_ceiling_before_count_ceiling() {
        let one = file(&"x".repeat(200)).size_estimate();
        let mut batch = UpdateBatch::new(1000, one * 2);
        let flushed: RefCell<Vec<usize>> = RefCell::new(Vec::new());
        let mut sink = |files: Vec<FileInfo>| -> landro_index::Result<()> {
            flushed.borrow_mut().push(files.len());
            Ok(())
        };

        batch.append(file(&"x".repeat(200)));
        batch.flush_if_full(&mut sink).unwrap();
        assert!(flushed.borrow().is_empty());

        batch.append(file(&"y".repeat(200)));
        batch.flush_if_full(&mut sink).unwrap();
        assert_eq!(*flushed.borrow(), vec![2]);
    }

    #[test]
    fn test_empty_flush_does_not_call_sink() {
        let mut batch = UpdateBatch::new(10, 10_000);
        let mut calls = 0;
        batch
            .flush(&mut |_files: Vec<FileInfo>| -> landro_index::Result<()> {
                calls += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_sink_error_propagates() {
        let mut batch = UpdateBatch::new(10, 10_000);
        batch.append(file("a"));
        let result = batch.flush(&mut |_files: Vec<FileInfo>| -> landro_index::Result<()> {
            Err(IndexError::Storage("disk full".to_string()))
        });
        assert!(result.is_err());
    }
}
