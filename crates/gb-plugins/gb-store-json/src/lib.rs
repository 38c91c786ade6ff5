//! # gb-store-json
//!
//! File-backed implementation of `ComplaintRepo`.
//! The whole collection is kept in memory and rewritten on every mutation:
//! serialized to `<file>.tmp` next to the target, synced, then renamed over
//! the target so readers never see a half-written file.

use chrono::Utc;
use gb_core::error::{AppError, Result};
use gb_core::models::{Complaint, NewComplaint};
use gb_core::traits::ComplaintRepo;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory mirror of the data file.
#[derive(Debug, Default)]
struct Ledger {
    /// Oldest first; every public view is reversed.
    complaints: Vec<Complaint>,
    next_id: u64,
}

impl Ledger {
    fn from_newest_first(mut complaints: Vec<Complaint>) -> Self {
        complaints.reverse();
        let next_id = complaints.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Self {
            complaints,
            next_id,
        }
    }

    fn newest_first(&self) -> impl Iterator<Item = &Complaint> {
        self.complaints.iter().rev()
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut Complaint> {
        self.complaints.iter_mut().find(|c| c.id == id)
    }
}

pub struct JsonComplaintStore {
    path: PathBuf,
    tmp_path: PathBuf,
    ledger: RwLock<Ledger>,
}

impl JsonComplaintStore {
    /// Loads `path`, creating its directory if needed. A missing or empty file
    /// is an empty store; unparsable content is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path_for(&path);
        match fs::remove_file(&tmp_path) {
            Ok(()) => log::warn!(
                "removed leftover {} from an interrupted write",
                tmp_path.display()
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let ledger = Ledger::from_newest_first(load(&path)?);
        log::info!(
            "loaded {} complaints from {} (next id {})",
            ledger.complaints.len(),
            path.display(),
            ledger.next_id
        );

        Ok(Self {
            path,
            tmp_path,
            ledger: RwLock::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ID the next successful `add` will receive.
    pub fn next_id(&self) -> u64 {
        self.read().next_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a mutation and persists it under one write lock.
    ///
    /// `apply` returns the caller's result plus whatever `revert` needs to undo
    /// the change; `revert` runs only if the file could not be written.
    fn transact<T, U>(
        &self,
        apply: impl FnOnce(&mut Ledger) -> Result<(T, U)>,
        revert: impl FnOnce(&mut Ledger, U),
    ) -> Result<T> {
        let mut ledger = self.write();
        let (output, undo) = apply(&mut ledger)?;
        if let Err(e) = self.persist(&ledger) {
            revert(&mut ledger, undo);
            return Err(e);
        }
        Ok(output)
    }

    fn persist(&self, ledger: &Ledger) -> Result<()> {
        let snapshot: Vec<&Complaint> = ledger.newest_first().collect();
        let data = serde_json::to_vec_pretty(&snapshot).map_err(io::Error::from)?;

        if let Err(e) = write_then_rename(&self.tmp_path, &self.path, &data) {
            log::error!("failed to persist complaints to {}: {e}", self.path.display());
            // a directory squatting on the temp path is not ours to remove
            if self.tmp_path.is_file() {
                let _ = fs::remove_file(&self.tmp_path);
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl ComplaintRepo for JsonComplaintStore {
    fn add(&self, draft: NewComplaint) -> Result<Complaint> {
        draft.validate()?;
        self.transact(
            |ledger| {
                let id = ledger.next_id;
                let complaint = draft.into_complaint(id, Utc::now());
                ledger.complaints.push(complaint.clone());
                ledger.next_id += 1;
                Ok((complaint, id))
            },
            |ledger, id| {
                ledger.complaints.pop();
                ledger.next_id = id;
            },
        )
    }

    fn list(&self) -> Result<Vec<Complaint>> {
        Ok(self
            .read()
            .newest_first()
            .filter(|c| !c.hidden)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Complaint>> {
        Ok(self.read().newest_first().cloned().collect())
    }

    fn get(&self, id: u64) -> Result<Complaint> {
        self.read()
            .complaints
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::complaint_not_found(id))
    }

    fn set_hidden(&self, id: u64, hidden: bool) -> Result<()> {
        self.transact(
            |ledger| {
                let complaint = ledger
                    .find_mut(id)
                    .ok_or_else(|| AppError::complaint_not_found(id))?;
                let prior = std::mem::replace(&mut complaint.hidden, hidden);
                Ok(((), prior))
            },
            |ledger, prior| {
                if let Some(complaint) = ledger.find_mut(id) {
                    complaint.hidden = prior;
                }
            },
        )
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn load(path: &Path) -> Result<Vec<Complaint>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&raw).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {e}", path.display()),
        )
        .into()
    })
}

fn write_then_rename(tmp: &Path, target: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, target)?;
    // the new file is already in place; a failed directory sync only weakens durability
    if let Err(e) = sync_parent_dir(target) {
        log::warn!("failed to sync directory of {}: {e}", target.display());
    }
    Ok(())
}

/// Flushes the directory entry so the rename survives a power loss.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
