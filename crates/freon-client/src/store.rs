//! The local share store.
//!
//! A single JSON document, `{"shares": [...]}`, pretty-printed with 4-space
//! indent at `$FREON_HOME/.freon.json` (falling back to `$HOME`). Created
//! empty on first load. Secret shares inside it are age-encrypted; losing
//! the file loses the seat, so it is written atomically enough for a laptop
//! but is the operator's to back up.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use serde::Serialize;

use freon_types::share::{ShareFile, ShareRecord};

use crate::{ClientError, Result};

/// Handle on the share store file.
pub struct ShareStore {
    path: PathBuf,
}

impl ShareStore {
    /// The store at the default location (`FREON_HOME` overrides `HOME`).
    pub fn open_default() -> Result<Self> {
        let home = std::env::var("FREON_HOME")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| ClientError::Store("neither FREON_HOME nor HOME is set".into()))?;
        Ok(ShareStore {
            path: PathBuf::from(home).join(".freon.json"),
        })
    }

    /// A store at an explicit path (used by tests).
    pub fn at(path: PathBuf) -> Self {
        ShareStore { path }
    }

    /// Load the share file, creating an empty one on first use.
    pub fn load(&self) -> Result<ShareFile> {
        match File::open(&self.path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))
                .map_err(|e| ClientError::Store(format!("parse {}: {e}", self.path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let empty = ShareFile::default();
                self.save(&empty)?;
                Ok(empty)
            }
            Err(err) => Err(ClientError::Store(format!(
                "open {}: {err}",
                self.path.display()
            ))),
        }
    }

    /// Write the share file back, pretty-printed with 4-space indent.
    pub fn save(&self, shares: &ShareFile) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        shares
            .serialize(&mut serializer)
            .map_err(|e| ClientError::Store(e.to_string()))?;
        buf.push(b'\n');

        let mut file = File::create(&self.path).map_err(|e| {
            ClientError::Store(format!("create {}: {e}", self.path.display()))
        })?;
        file.write_all(&buf)
            .map_err(|e| ClientError::Store(e.to_string()))?;
        Ok(())
    }

    /// Append a share record.
    pub fn append_share(&self, record: ShareRecord) -> Result<()> {
        let mut shares = self.load()?;
        shares.shares.push(record);
        self.save(&shares)
    }

    /// Find the share record for a group.
    pub fn lookup_share(&self, group_id: &str) -> Result<Option<ShareRecord>> {
        Ok(self
            .load()?
            .shares
            .into_iter()
            .find(|s| s.group_id == group_id))
    }
}
