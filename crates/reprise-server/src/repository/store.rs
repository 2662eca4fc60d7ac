//! Recording repository: the flat key namespace and every mutation on it.

use super::snapshot::{self, Snapshot, SnapshotEntry};
use super::tree::{self, RecordingTree};
use super::types::{ActivationSummary, MatchStatus, Relocation, RepositoryError, SaveOutcome};
use crate::behaviors::SelectionEngine;
use crate::pattern::{validate_match, RequestField};
use crate::recording::{key, CompiledRecording, Recording};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A stored document together with its compiled form.
///
/// `compiled` is `None` when the pattern does not compile; such a recording
/// can be stored and edited but never activated.
#[derive(Debug)]
pub struct StoredRecording {
    pub document: Recording,
    pub compiled: Option<CompiledRecording>,
}

impl StoredRecording {
    fn new(document: Recording) -> Self {
        let compiled = match CompiledRecording::compile(&document) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                warn!("Stored recording does not compile: {}", e);
                None
            }
        };
        Self { document, compiled }
    }
}

#[derive(Debug)]
struct RecordingSlot {
    activated: AtomicBool,
    stored: RwLock<Arc<StoredRecording>>,
}

impl RecordingSlot {
    fn new(stored: Arc<StoredRecording>, activated: bool) -> Arc<Self> {
        Arc::new(Self {
            activated: AtomicBool::new(activated),
            stored: RwLock::new(stored),
        })
    }

    fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    fn current(&self) -> Arc<StoredRecording> {
        Arc::clone(&self.stored.read())
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Directory,
    Recording(Arc<RecordingSlot>),
}

type Namespace = BTreeMap<String, Entry>;

/// An activated, compilable recording as seen by the simulator.
#[derive(Debug, Clone)]
pub struct ActiveRecording {
    pub key: String,
    pub stored: Arc<StoredRecording>,
}

/// Owns `key -> document` and `key -> activated` for every recording.
///
/// Structural mutations (create, delete, move, copy, activate, import) take
/// the namespace write lock and apply as one transition. Saving an existing
/// recording takes the namespace read lock plus the recording's own lock.
/// With a snapshot file, the file is written before a transition becomes
/// visible; a failed write leaves the repository unchanged and returns
/// [`RepositoryError::Io`]. Lock order is namespace, snapshot, recording.
pub struct RecordingRepository {
    namespace: RwLock<Namespace>,
    selection: SelectionEngine,
    snapshot_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl Default for RecordingRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(path: &str, reason: &'static str) -> RepositoryError {
    RepositoryError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

/// Normalize a user-supplied key and reject malformed ones.
fn checked_key(raw: &str) -> Result<&str, RepositoryError> {
    let key = key::normalize(raw);
    key::check(key).map_err(|reason| invalid(raw, reason))?;
    Ok(key)
}

fn dir_exists(ns: &Namespace, dir: &str) -> bool {
    dir.is_empty()
        || ns
            .range::<str, _>((Bound::Included(dir), Bound::Unbounded))
            .next()
            .is_some_and(|(k, _)| k.starts_with(dir))
}

/// Existing key that prevents `key` from being inserted, if any.
///
/// A key conflicts with itself, with a recording named like one of its
/// ancestor directories, and (for a recording) with a directory of the same name.
fn conflict(ns: &Namespace, path: &str) -> Option<String> {
    if ns.contains_key(path) {
        return Some(path.to_string());
    }
    for dir in key::ancestors(path).filter(|d| !d.is_empty()) {
        let as_leaf = dir.trim_end_matches('/');
        if matches!(ns.get(as_leaf), Some(Entry::Recording(_))) {
            return Some(as_leaf.to_string());
        }
    }
    if key::is_directory(path) {
        let as_leaf = path.trim_end_matches('/');
        if matches!(ns.get(as_leaf), Some(Entry::Recording(_))) {
            return Some(as_leaf.to_string());
        }
    } else {
        let as_dir = format!("{path}/");
        if dir_exists(ns, &as_dir) {
            return Some(as_dir);
        }
    }
    None
}

fn insert_checked(ns: &mut Namespace, path: String, entry: Entry) -> Result<(), RepositoryError> {
    if let Some(existing) = conflict(ns, &path) {
        return Err(RepositoryError::AlreadyExists(existing));
    }
    ns.insert(path, entry);
    Ok(())
}

/// Keys under a directory, the directory placeholder included.
fn keys_under(ns: &Namespace, dir: &str) -> Vec<String> {
    ns.range::<str, _>((Bound::Included(dir), Bound::Unbounded))
        .take_while(|(k, _)| k.starts_with(dir))
        .map(|(k, _)| k.clone())
        .collect()
}

/// Keep the parent of a removed entry visible as an (empty) directory.
fn keep_parent(ns: &mut Namespace, path: &str) {
    let parent = key::parent(path);
    if !parent.is_empty() && !dir_exists(ns, parent) {
        ns.insert(parent.to_string(), Entry::Directory);
    }
}

fn carry_original(
    path: &str,
    stored: &Recording,
    incoming: &mut Recording,
) -> Result<(), RepositoryError> {
    match (&stored.original_request, &incoming.original_request) {
        (Some(_), None) => incoming.original_request = stored.original_request.clone(),
        (Some(a), Some(b)) if a != b => {
            return Err(RepositoryError::OriginalImmutable(path.to_string()))
        }
        _ => {}
    }
    match (&stored.original_response, &incoming.original_response) {
        (Some(_), None) => incoming.original_response = stored.original_response.clone(),
        (Some(a), Some(b)) if a != b => {
            return Err(RepositoryError::OriginalImmutable(path.to_string()))
        }
        _ => {}
    }
    Ok(())
}

/// Document and activation flag standing in for one key's stored state.
type Replacement<'a> = (&'a str, &'a Recording, bool);

/// Build the snapshot of `ns`, reading `replaced` instead of that key's slot.
fn snapshot_of(ns: &Namespace, replaced: Option<Replacement<'_>>) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for (path, entry) in ns.iter() {
        match entry {
            Entry::Directory => snapshot.directories.push(path.clone()),
            Entry::Recording(_) if replaced.is_some_and(|(k, _, _)| k == path.as_str()) => {}
            Entry::Recording(slot) => {
                snapshot.recordings.insert(
                    path.clone(),
                    SnapshotEntry {
                        activated: slot.is_activated(),
                        recording: slot.current().document.clone(),
                    },
                );
            }
        }
    }
    if let Some((path, recording, activated)) = replaced {
        snapshot.recordings.insert(
            path.to_string(),
            SnapshotEntry {
                activated,
                recording: recording.clone(),
            },
        );
    }
    snapshot
}

impl RecordingRepository {
    /// An in-memory repository with no snapshot file.
    pub fn new() -> Self {
        Self {
            namespace: RwLock::new(BTreeMap::new()),
            selection: SelectionEngine::new(),
            snapshot_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// A repository mirrored to `path`, loading it first if it exists.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let mut ns = BTreeMap::new();
        if let Some(snapshot) = snapshot::load_from_file(&path)? {
            for dir in snapshot.directories {
                let dir = checked_key(&dir)?.to_string();
                if key::is_directory(&dir) && !dir.is_empty() {
                    ns.insert(dir, Entry::Directory);
                }
            }
            for (path, entry) in snapshot.recordings {
                let path = checked_key(&path)?.to_string();
                if key::is_directory(&path) {
                    return Err(invalid(&path, "recording key ends with '/'"));
                }
                let stored = Arc::new(StoredRecording::new(entry.recording));
                let activated = entry.activated && stored.compiled.is_some();
                if entry.activated && !activated {
                    warn!("Recording {} does not compile and stays deactivated", path);
                }
                ns.insert(path, Entry::Recording(RecordingSlot::new(stored, activated)));
            }
        }
        Ok(Self {
            namespace: RwLock::new(ns),
            selection: SelectionEngine::new(),
            snapshot_path: Some(path),
            persist_lock: Mutex::new(()),
        })
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Number of recordings (directories excluded).
    pub fn len(&self) -> usize {
        self.namespace
            .read()
            .values()
            .filter(|e| matches!(e, Entry::Recording(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every recording with its activation flag, plus every directory
    /// (explicit or implied) flagged when anything below it is activated.
    pub fn list(&self) -> BTreeMap<String, bool> {
        let ns = self.namespace.read();
        let mut listing = BTreeMap::new();
        for (path, entry) in ns.iter() {
            let activated = match entry {
                Entry::Directory => {
                    listing.entry(path.clone()).or_insert(false);
                    false
                }
                Entry::Recording(slot) => {
                    let activated = slot.is_activated();
                    listing.insert(path.clone(), activated);
                    activated
                }
            };
            let own_dir = key::is_directory(path).then_some(path.as_str());
            for dir in key::ancestors(path)
                .filter(|d| !d.is_empty())
                .chain(own_dir)
            {
                let flag = listing.entry(dir.to_string()).or_insert(false);
                *flag |= activated;
            }
        }
        listing
    }

    pub fn tree(&self) -> RecordingTree {
        tree::build(&self.list())
    }

    /// The stored document and its activation flag.
    pub fn get(&self, path: &str) -> Result<(Recording, bool), RepositoryError> {
        let path = checked_key(path)?;
        let ns = self.namespace.read();
        match ns.get(path) {
            Some(Entry::Recording(slot)) => {
                Ok((slot.current().document.clone(), slot.is_activated()))
            }
            Some(Entry::Directory) => Err(RepositoryError::NotARecording(path.to_string())),
            None if dir_exists(&ns, &format!("{path}/")) => {
                Err(RepositoryError::NotARecording(path.to_string()))
            }
            None => Err(RepositoryError::NotFound(path.to_string())),
        }
    }

    /// Create an empty recording, or a directory when `path` ends with `/`.
    pub fn create(&self, path: &str) -> Result<String, RepositoryError> {
        let path = checked_key(path)?;
        if path.is_empty() {
            return Err(invalid(path, "the root directory always exists"));
        }
        let entry = if key::is_directory(path) {
            Entry::Directory
        } else {
            let stored = Arc::new(StoredRecording::new(Recording::empty()));
            Entry::Recording(RecordingSlot::new(stored, false))
        };
        {
            let mut ns = self.namespace.write();
            let mut next = ns.clone();
            insert_checked(&mut next, path.to_string(), entry)?;
            self.persist(&next)?;
            *ns = next;
        }
        info!("Created {}", path);
        Ok(path.to_string())
    }

    /// Delete a recording, or a directory with everything below it.
    ///
    /// Deleting the root removes every entry. Returns the number of recordings removed.
    pub fn delete(&self, path: &str) -> Result<usize, RepositoryError> {
        let path = checked_key(path)?;
        let removed = {
            let mut ns = self.namespace.write();
            let doomed = if key::is_directory(path) {
                keys_under(&ns, path)
            } else if ns.contains_key(path) {
                vec![path.to_string()]
            } else {
                keys_under(&ns, &format!("{path}/"))
            };
            if doomed.is_empty() && !path.is_empty() {
                return Err(RepositoryError::NotFound(path.to_string()));
            }
            let mut next = ns.clone();
            let mut removed = 0;
            for k in &doomed {
                if let Some(Entry::Recording(_)) = next.remove(k) {
                    removed += 1;
                }
            }
            if !path.is_empty() {
                keep_parent(&mut next, path);
            }
            self.persist(&next)?;
            *ns = next;
            removed
        };
        self.selection.forget(path);
        if !key::is_directory(path) {
            self.selection.forget(&format!("{path}/"));
        }
        info!("Deleted {} ({} recordings)", path, removed);
        Ok(removed)
    }

    /// Move or copy a recording or directory. Returns the new key.
    ///
    /// A `target` ending in `/` is a destination directory; anything else is
    /// the new name. Fails without changes on a missing source, a collision
    /// with any existing key, or a directory moved into itself.
    pub fn relocate(
        &self,
        source: &str,
        target: &str,
        mode: Relocation,
    ) -> Result<String, RepositoryError> {
        let source = checked_key(source)?;
        checked_key(target)?;
        if source.is_empty() {
            return Err(invalid(source, "the root directory cannot be moved or copied"));
        }

        let mut ns = self.namespace.write();

        // A bare name that only exists as a directory refers to that directory.
        let source_dir;
        let source = if !key::is_directory(source)
            && !ns.contains_key(source)
            && dir_exists(&ns, &format!("{source}/"))
        {
            source_dir = format!("{source}/");
            source_dir.as_str()
        } else {
            source
        };
        let destination = key::relocate(source, target);

        let moved = if key::is_directory(source) {
            if destination.starts_with(source) {
                return Err(RepositoryError::IntoItself {
                    from: source.to_string(),
                    to: destination,
                });
            }
            keys_under(&ns, source)
        } else {
            match ns.get(source) {
                Some(Entry::Recording(_)) => vec![source.to_string()],
                _ => Vec::new(),
            }
        };
        if moved.is_empty() {
            return Err(RepositoryError::NotFound(source.to_string()));
        }
        if destination == source {
            return Err(RepositoryError::AlreadyExists(destination));
        }

        let mut next = ns.clone();
        if mode == Relocation::Move {
            for k in &moved {
                next.remove(k);
            }
            keep_parent(&mut next, source);
        }
        for old in &moved {
            let new_key = format!("{destination}{}", &old[source.len()..]);
            let entry = match (&ns[old], mode) {
                (Entry::Recording(slot), Relocation::Copy) => {
                    Entry::Recording(RecordingSlot::new(slot.current(), false))
                }
                (entry, _) => entry.clone(),
            };
            insert_checked(&mut next, new_key, entry)?;
        }
        self.persist(&next)?;
        *ns = next;
        drop(ns);

        match mode {
            Relocation::Move => self.selection.forget(source),
            Relocation::Copy => self.selection.forget(&destination),
        }
        info!(
            "{} {} to {} ({} entries)",
            if mode == Relocation::Move { "Moved" } else { "Copied" },
            source,
            destination,
            moved.len()
        );
        Ok(destination)
    }

    /// Apply a batch of activation changes as one transition.
    ///
    /// `""` or `"/"` selects every recording and a directory selects everything
    /// below it. Later entries override earlier ones for the same recording.
    /// When the snapshot cannot be written every flag is restored.
    pub fn activate(
        &self,
        changes: &BTreeMap<String, bool>,
    ) -> Result<ActivationSummary, RepositoryError> {
        let mut summary = ActivationSummary::default();
        {
            let ns = self.namespace.write();
            let mut targets: BTreeMap<String, bool> = BTreeMap::new();
            for (raw, desired) in changes {
                let Ok(path) = checked_key(raw) else {
                    warn!("Skipping malformed path {:?}", raw);
                    summary.skipped += 1;
                    continue;
                };
                let dir = if key::is_directory(path) {
                    Some(path.to_string())
                } else if ns.contains_key(path) {
                    None
                } else {
                    Some(format!("{path}/"))
                };
                match dir {
                    None => {
                        targets.insert(path.to_string(), *desired);
                    }
                    Some(dir) if dir_exists(&ns, &dir) => {
                        for k in keys_under(&ns, &dir) {
                            if !key::is_directory(&k) {
                                targets.insert(k, *desired);
                            }
                        }
                    }
                    Some(_) => {
                        warn!("Skipping unknown path {}", path);
                        summary.skipped += 1;
                    }
                }
            }

            let mut flipped = Vec::new();
            for (path, desired) in targets {
                let Some(Entry::Recording(slot)) = ns.get(&path) else {
                    summary.skipped += 1;
                    continue;
                };
                if slot.is_activated() == desired {
                    summary.skipped += 1;
                } else if desired && slot.current().compiled.is_none() {
                    warn!("Skipping {}: pattern does not compile", path);
                    summary.skipped += 1;
                } else {
                    slot.activated.store(desired, Ordering::Release);
                    debug!("{} {}", if desired { "Activated" } else { "Deactivated" }, path);
                    flipped.push((slot, desired));
                }
            }
            summary.loaded = flipped.len();

            if !flipped.is_empty() {
                if let Err(e) = self.persist(&ns) {
                    for (slot, desired) in flipped {
                        slot.activated.store(!desired, Ordering::Release);
                    }
                    return Err(e);
                }
            }
        }
        info!(
            "Activation changed {} recordings, skipped {}",
            summary.loaded, summary.skipped
        );
        Ok(summary)
    }

    /// Replace a whole document, creating the recording if it does not exist.
    ///
    /// The original request/response pair is immutable once set: an absent
    /// pair is carried over from the stored document and a different one is
    /// rejected. The selection cursor restarts at the first template.
    pub fn save(&self, path: &str, mut recording: Recording) -> Result<SaveOutcome, RepositoryError> {
        let path = checked_key(path)?;
        if key::is_directory(path) {
            return Err(RepositoryError::NotARecording(path.to_string()));
        }
        recording.validate()?;

        let intact = {
            let ns = self.namespace.read();
            let existing = ns.get(path).cloned();
            match existing {
                Some(Entry::Recording(slot)) => {
                    self.replace_document(path, &ns, &slot, &mut recording)?
                }
                Some(Entry::Directory) => {
                    return Err(RepositoryError::NotARecording(path.to_string()))
                }
                None => {
                    drop(ns);
                    let mut ns = self.namespace.write();
                    match ns.get(path).cloned() {
                        Some(Entry::Recording(slot)) => {
                            self.replace_document(path, &ns, &slot, &mut recording)?
                        }
                        _ => {
                            let stored = Arc::new(StoredRecording::new(recording.clone()));
                            let mut next = ns.clone();
                            insert_checked(
                                &mut next,
                                path.to_string(),
                                Entry::Recording(RecordingSlot::new(stored, false)),
                            )?;
                            self.persist(&next)?;
                            *ns = next;
                            match &self.snapshot_path {
                                Some(_) => self.reread(path).as_ref() == Some(&recording),
                                None => true,
                            }
                        }
                    }
                }
            }
        };
        self.selection.reset(path);
        info!("Saved {}", path);
        Ok(self.outcome(path, &recording, intact))
    }

    /// Import documents into `directory` as one transition. Returns the new keys.
    ///
    /// Every document is validated first; any invalid document or key
    /// collision fails the whole import.
    pub fn import(
        &self,
        directory: &str,
        recordings: BTreeMap<String, Recording>,
    ) -> Result<Vec<String>, RepositoryError> {
        let mut directory = checked_key(directory)?.to_string();
        if !key::is_directory(&directory) {
            directory.push('/');
        }

        let mut prepared = Vec::with_capacity(recordings.len());
        for (name, recording) in recordings {
            let name = checked_key(&name)?;
            if name.is_empty() || key::is_directory(name) {
                return Err(invalid(name, "import names must name recordings"));
            }
            recording.validate()?;
            let stored = Arc::new(StoredRecording::new(recording));
            prepared.push((format!("{directory}{name}"), stored));
        }

        let keys: Vec<String> = prepared.iter().map(|(k, _)| k.clone()).collect();
        {
            let mut ns = self.namespace.write();
            let mut next = ns.clone();
            for (path, stored) in prepared {
                insert_checked(&mut next, path, Entry::Recording(RecordingSlot::new(stored, false)))?;
            }
            self.persist(&next)?;
            *ns = next;
        }
        info!("Imported {} recordings into {}", keys.len(), directory);
        Ok(keys)
    }

    /// Activated recordings that compile, in key order.
    pub fn active_recordings(&self) -> Vec<ActiveRecording> {
        let ns = self.namespace.read();
        ns.iter()
            .filter_map(|(path, entry)| match entry {
                Entry::Recording(slot) if slot.is_activated() => {
                    let stored = slot.current();
                    stored.compiled.is_some().then(|| ActiveRecording {
                        key: path.clone(),
                        stored,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// The document stored for `path` in the snapshot file.
    fn reread(&self, path: &str) -> Option<Recording> {
        let file = self.snapshot_path.as_ref()?;
        match snapshot::load_from_file(file) {
            Ok(Some(mut snapshot)) => snapshot.recordings.remove(path).map(|e| e.recording),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not re-read snapshot {:?}: {}", file, e);
                None
            }
        }
    }

    fn outcome(&self, path: &str, recording: &Recording, intact: bool) -> SaveOutcome {
        let mut warnings = recording.warnings();
        let (status, fields, slow) = match &recording.original_request {
            Some(original) => {
                let validation = validate_match(&recording.request_pattern, original);
                for field in validation.failed_fields() {
                    warnings.push(format!(
                        "the {field} pattern does not match the original request"
                    ));
                }
                let slow = validation.slow_fields();
                (MatchStatus::Validated, validation.fields, slow)
            }
            None => (
                MatchStatus::NoOriginal,
                RequestField::ALL.into_iter().map(|f| (f, None)).collect(),
                Vec::new(),
            ),
        };
        let match_status = if intact {
            status
        } else {
            warn!("Recording {} differs from what was saved", path);
            MatchStatus::CorruptedAfterSave
        };
        SaveOutcome {
            match_status,
            fields,
            slow,
            warnings,
        }
    }

    /// Mirror `ns` to the snapshot file before it becomes the visible state.
    ///
    /// Callers hold the namespace lock, so the file never runs ahead of or
    /// behind what readers can observe.
    fn persist(&self, ns: &Namespace) -> Result<(), RepositoryError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock();
        snapshot::save_to_file(path, &snapshot_of(ns, None)).map_err(|e| {
            error!("Failed to write snapshot {:?}: {}", path, e);
            RepositoryError::Io(e)
        })
    }

    /// Swap the document held by `slot`, writing the snapshot first.
    ///
    /// The recording lock is held from the snapshot write until the re-read,
    /// so a concurrent save of the same key cannot interleave. Returns whether
    /// the re-read document equals the saved one. A recording that stops
    /// compiling is deactivated.
    fn replace_document(
        &self,
        path: &str,
        ns: &Namespace,
        slot: &RecordingSlot,
        recording: &mut Recording,
    ) -> Result<bool, RepositoryError> {
        let _persist = self.snapshot_path.as_ref().map(|_| self.persist_lock.lock());
        let mut stored = slot.stored.write();
        carry_original(path, &stored.document, recording)?;
        let replacement = Arc::new(StoredRecording::new(recording.clone()));
        let deactivate = slot.is_activated() && replacement.compiled.is_none();

        if let Some(file) = &self.snapshot_path {
            let activated = slot.is_activated() && !deactivate;
            let snapshot = snapshot_of(ns, Some((path, &replacement.document, activated)));
            snapshot::save_to_file(file, &snapshot).map_err(|e| {
                error!("Failed to write snapshot {:?}: {}", file, e);
                RepositoryError::Io(e)
            })?;
        }

        if deactivate {
            warn!("Recording {} no longer compiles and was deactivated", path);
            slot.activated.store(false, Ordering::Release);
        }
        *stored = replacement;
        let intact = match &self.snapshot_path {
            Some(_) => self.reread(path).as_ref() == Some(&*recording),
            None => stored.document == *recording,
        };
        Ok(intact)
    }
}
