use crate::error::{Err, Result};
use memmap::Mmap;
use std::fs::File;
use std::path::Path;

/// The bytes of an input file.
///
/// Non-empty files are memory mapped read-only; empty files cannot be mapped and
/// are kept as an empty buffer.
pub enum InputFile {
    /// A memory buffer.
    Mem(Vec<u8>),
    /// A read-only memory mapped buffer.
    Mmap(Mmap),
}

impl InputFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            Ok(InputFile::Mem(vec![]))
        } else {
            Ok(InputFile::Mmap(unsafe { Mmap::map(&file)? }))
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            InputFile::Mem(buffer) => &buffer[..],
            InputFile::Mmap(mmap) => &mmap[..],
        }
    }

    /// View the file as text; `name` only serves the error message.
    pub fn as_str(&self, name: &str) -> Result<&str> {
        std::str::from_utf8(self.as_bytes()).map_err(|e| Err::Encoding {
            file: String::from(name),
            offset: e.valid_up_to(),
        })
    }
}
