use anyhow::{anyhow, Context, Result};
use memmap2::{Mmap, MmapOptions};
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;

pub const ELEMENT_SIZE: usize = std::mem::size_of::<i64>();

/// The consecutive values `1..=len`.
pub fn iota(len: usize) -> Vec<i64> {
    (1..=len as i64).into_par_iter().collect()
}

/// Sum computed independently of the reducer, used to check every pass.
pub fn reference_sum(data: &[i64]) -> Result<i64> {
    data.par_iter()
        .map(|&value| Some(value))
        .try_reduce(|| 0, |acc, value| acc.checked_add(value))
        .ok_or_else(|| anyhow!("Dataset of {} values overflows an i64 sum", data.len()))
}

/// Memory-mapped file of little-endian `i64` values.
pub struct DatasetReader {
    mmap: Mmap,
    len: usize,
}

impl DatasetReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open dataset: {}", path.as_ref().display()))?;

        let file_size = file.metadata()?.len() as usize;

        if !file_size.is_multiple_of(ELEMENT_SIZE) {
            anyhow::bail!(
                "Invalid dataset size: {} is not a multiple of {}",
                file_size,
                ELEMENT_SIZE
            );
        }

        let mmap = unsafe {
            MmapOptions::new()
                .map(&file)
                .with_context(|| "Failed to memory-map dataset")?
        };

        Ok(Self {
            mmap,
            len: file_size / ELEMENT_SIZE,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decodes the whole file into an owned sequence.
    pub fn to_vec(&self) -> Vec<i64> {
        self.mmap[..self.len * ELEMENT_SIZE]
            .par_chunks_exact(ELEMENT_SIZE)
            .map(|bytes| {
                let mut raw = [0u8; ELEMENT_SIZE];
                raw.copy_from_slice(bytes);
                i64::from_le_bytes(raw)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_iota() {
        assert_eq!(iota(5), vec![1, 2, 3, 4, 5]);
        assert!(iota(0).is_empty());
        assert_eq!(reference_sum(&iota(10)).unwrap(), 55);
    }

    #[test]
    fn test_reference_sum_rejects_overflow() {
        let err = reference_sum(&[i64::MAX, 1]).unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert_eq!(reference_sum(&[-3, 5, -2]).unwrap(), 0);
        assert_eq!(reference_sum(&[]).unwrap(), 0);
    }

    #[test]
    fn test_reader_decodes_little_endian() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for value in [1i64, -2, 300] {
            file.write_all(&value.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();

        let reader = DatasetReader::new(file.path()).unwrap();
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.to_vec(), vec![1, -2, 300]);
    }

    #[test]
    fn test_reader_rejects_truncated_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 12]).unwrap();
        file.flush().unwrap();

        assert!(DatasetReader::new(file.path()).is_err());
    }
}
