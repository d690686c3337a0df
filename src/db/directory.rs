use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{pir_err, Result};

use super::{padded_slice, DbHandler};

#[derive(Debug)]
enum Backing {
    /// One file per element, sorted by file name
    Files(Vec<(PathBuf, u64)>),
    /// One file cut into equal streams
    Split {
        path: PathBuf,
        mmap: Mmap,
        stream_bytesize: u64,
        num_streams: u64,
    },
}

/// Database backed by the file system
#[derive(Debug)]
pub struct DbDirectoryProcessor {
    backing: Backing,
    max_element_bytesize: u64,
}

impl DbDirectoryProcessor {
    /// Use every regular file in `dir` as one element, ordered by file name
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
        if files.is_empty() {
            return Err(pir_err!(
                Database,
                "no files found in {}",
                dir.display()
            ));
        }
        files.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));

        let max_element_bytesize = files.iter().map(|(_, len)| *len).max().unwrap_or(0);
        debug!(
            "Opened directory {} with {} files (largest {} bytes)",
            dir.display(),
            files.len(),
            max_element_bytesize
        );

        Ok(Self {
            backing: Backing::Files(files),
            max_element_bytesize,
        })
    }

    /// Memory-map a single file and expose it as `num_streams` equal elements.
    ///
    /// The last element is zero-padded when the file size is not a multiple
    /// of `num_streams`.
    pub fn split_file(path: &Path, num_streams: u64) -> Result<Self> {
        if num_streams == 0 {
            return Err(pir_err!(Database, "cannot split into zero streams"));
        }
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        if file_len == 0 {
            return Err(pir_err!(Database, "{} is empty", path.display()));
        }
        // SAFETY: File is opened read-only and not modified during the mmap lifetime.
        let mmap = unsafe { Mmap::map(&file)? };
        let stream_bytesize = file_len.div_ceil(num_streams);
        debug!(
            "Split {} ({} bytes) into {} streams of {} bytes",
            path.display(),
            file_len,
            num_streams,
            stream_bytesize
        );

        Ok(Self {
            backing: Backing::Split {
                path: path.to_path_buf(),
                mmap,
                stream_bytesize,
                num_streams,
            },
            max_element_bytesize: stream_bytesize,
        })
    }

    fn out_of_range(&self, index: u64) -> crate::error::PirError {
        pir_err!(
            Database,
            "element {} out of range ({} elements)",
            index,
            self.num_elements()
        )
    }
}

impl DbHandler for DbDirectoryProcessor {
    fn num_elements(&self) -> u64 {
        match &self.backing {
            Backing::Files(files) => files.len() as u64,
            Backing::Split { num_streams, .. } => *num_streams,
        }
    }

    fn max_element_bytesize(&self) -> u64 {
        self.max_element_bytesize
    }

    fn element_name(&self, index: u64) -> String {
        match &self.backing {
            Backing::Files(files) => files
                .get(index as usize)
                .and_then(|(path, _)| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Backing::Split { path, .. } => {
                let stem = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}.part{}", stem, index)
            }
        }
    }

    fn read_element_chunk(&self, index: u64, offset: u64, len: usize) -> Result<Vec<u8>> {
        if index >= self.num_elements() {
            return Err(self.out_of_range(index));
        }
        match &self.backing {
            Backing::Files(files) => {
                let (path, file_len) = &files[index as usize];
                let mut out = vec![0u8; len];
                if offset >= *file_len {
                    return Ok(out);
                }
                let available = ((*file_len - offset) as usize).min(len);
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut out[..available])?;
                Ok(out)
            }
            Backing::Split {
                mmap,
                stream_bytesize,
                ..
            } => {
                let start = (index * stream_bytesize).min(mmap.len() as u64);
                let end = (start + stream_bytesize).min(mmap.len() as u64);
                let stream = &mmap[start as usize..end as usize];
                Ok(padded_slice(stream, offset, len))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_directory_sorted_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"bravo").unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha!").unwrap();
        fs::write(dir.path().join("c.txt"), b"c").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();

        let db = DbDirectoryProcessor::open(dir.path()).unwrap();
        assert_eq!(db.num_elements(), 3);
        assert_eq!(db.max_element_bytesize(), 6);
        assert_eq!(db.element_name(0), "a.txt");
        assert_eq!(db.element_name(2), "c.txt");

        assert_eq!(db.read_element_chunk(1, 0, 6).unwrap(), b"bravo\0");
        assert_eq!(db.read_element_chunk(0, 4, 4).unwrap(), b"a!\0\0");
        assert_eq!(db.read_element_chunk(2, 5, 2).unwrap(), vec![0, 0]);
        assert!(db.read_element_chunk(3, 0, 1).is_err());
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempdir().unwrap();
        assert!(DbDirectoryProcessor::open(dir.path()).is_err());
    }

    #[test]
    fn test_split_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(&(0u8..10).collect::<Vec<_>>()).unwrap();
        drop(file);

        let db = DbDirectoryProcessor::split_file(&path, 3).unwrap();
        assert_eq!(db.num_elements(), 3);
        assert_eq!(db.max_element_bytesize(), 4);
        assert_eq!(db.element_name(1), "blob.bin.part1");
        assert_eq!(db.read_element_chunk(0, 0, 4).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(db.read_element_chunk(1, 1, 3).unwrap(), vec![5, 6, 7]);
        assert_eq!(db.read_element_chunk(2, 0, 4).unwrap(), vec![8, 9, 0, 0]);
    }
}
