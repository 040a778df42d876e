//! ReloadManager: owns the live tree and re-applies definitions when their
//! documents or shared styles change.
//!
//! All mutation happens on the caller's thread inside [`ReloadManager::handle`].
//! File watchers run as tokio tasks and only send [`ReloadEvent`]s over an
//! unbounded channel, so events for one path are handled in the order they
//! were observed.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, instrument, warn};

use crate::live::{
    ApplyError, CapabilityRegistry, GenericElement, LiveApplier, RootBinding, ViewNode, ViewTree,
};
use crate::markup::{parse_definition, parse_style_group, ParseError};
use crate::reload::config::ReloadConfig;
use crate::reload::diagnostics::Diagnostics;
use crate::reload::registry::DefinitionRegistry;
use crate::reload::watcher::{FileWatcher, ReloadEvent, WatchError};
use crate::style::StyleResolver;

new_key_type! {
    /// Handle to a registered root.
    pub struct RootId;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("cannot read document: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("invalid document: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("cannot apply `{type_name}`: {source}")]
    Apply {
        type_name: String,
        #[source]
        source: ApplyError,
    },

    #[error("unknown component type `{0}`")]
    UnknownType(String),

    #[error("unknown root {0:?}")]
    UnknownRoot(RootId),
}

impl ReloadError {
    /// The file the error belongs to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ReloadError::Io { path, .. } | ReloadError::Parse { path, .. } => Some(path),
            ReloadError::Watch(WatchError::NoRuntime { path }) => Some(path),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

struct RootEntry {
    binding: RootBinding,
    path: PathBuf,
    /// Generation of every definition the last apply attempt depended on,
    /// whether or not it succeeded.
    /// Types missing at the time map to `None`.
    attempted: HashMap<String, Option<u64>>,
}

/// A watched component document and the roots loaded from it.
struct PathWatch {
    watcher: Option<FileWatcher>,
    subscribers: Vec<RootId>,
}

/// A watched shared style document.
struct StyleWatch {
    watcher: Option<FileWatcher>,
    /// Group name the document provided when last loaded.
    group: Option<String>,
}

/// What one handled event did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReloadOutcome {
    pub path: PathBuf,
    /// Roots re-applied successfully, each at most once.
    pub reapplied: Vec<RootId>,
    /// Roots whose apply failed.
    pub failed: Vec<RootId>,
}

// ---------------------------------------------------------------------------
// ReloadManager
// ---------------------------------------------------------------------------

/// Watches component and style documents and keeps bound roots in sync.
pub struct ReloadManager {
    config: ReloadConfig,
    tree: ViewTree,
    registry: CapabilityRegistry,
    styles: StyleResolver,
    definitions: DefinitionRegistry,
    diagnostics: Diagnostics,
    roots: SlotMap<RootId, RootEntry>,
    watches: HashMap<PathBuf, PathWatch>,
    style_watches: HashMap<PathBuf, StyleWatch>,
    /// Documents whose last read or parse failed.
    broken: HashSet<PathBuf>,
    /// Documents loaded by discovery. Their definitions outlive their roots.
    discovered: HashSet<PathBuf>,
    sender: UnboundedSender<ReloadEvent>,
    receiver: UnboundedReceiver<ReloadEvent>,
}

impl ReloadManager {
    /// Create a manager. No files are touched until [`start`](Self::start)
    /// or [`register`](Self::register).
    pub fn new(config: ReloadConfig, registry: CapabilityRegistry) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            tree: ViewTree::new(),
            registry,
            styles: StyleResolver::new(),
            definitions: DefinitionRegistry::new(),
            diagnostics: Diagnostics::new(),
            roots: SlotMap::with_key(),
            watches: HashMap::new(),
            style_watches: HashMap::new(),
            broken: HashSet::new(),
            discovered: HashSet::new(),
            sender,
            receiver,
        }
    }

    /// Load the configured shared styles and run discovery.
    ///
    /// Style documents that fail to load are reported through
    /// [`diagnostics`](Self::diagnostics) rather than returned.
    pub fn start(&mut self) -> Result<(), ReloadError> {
        for path in self.config.shared_style_paths.clone() {
            self.watch_styles(path)?;
        }
        if let Some(root) = self.config.discovery_root.clone() {
            self.discover(&root)?;
        }
        Ok(())
    }

    // ---- Accessors ----

    pub fn config(&self) -> &ReloadConfig {
        &self.config
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    pub fn styles(&self) -> &StyleResolver {
        &self.styles
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// A root's binding, if it is still registered and in the tree.
    pub fn root(&self, id: RootId) -> Option<&RootBinding> {
        self.roots
            .get(id)
            .map(|entry| &entry.binding)
            .filter(|binding| self.tree.contains(binding.node))
    }

    /// Number of registered roots, after pruning removed ones.
    pub fn root_count(&mut self) -> usize {
        self.prune();
        self.roots.len()
    }

    /// A sender for injecting events, e.g. from an external watcher.
    pub fn sender(&self) -> UnboundedSender<ReloadEvent> {
        self.sender.clone()
    }

    /// Whether a live watcher polls `path`.
    pub fn is_watching(&self, path: &Path) -> bool {
        let watcher = match self.watches.get(path) {
            Some(watch) => watch.watcher.as_ref(),
            None => self
                .style_watches
                .get(path)
                .and_then(|watch| watch.watcher.as_ref()),
        };
        watcher.is_some_and(|watcher| !watcher.is_finished())
    }

    /// Every type that can be instantiated: compiled types plus loaded
    /// definitions, sorted.
    pub fn all_type_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .config
            .compiled_types
            .iter()
            .map(String::as_str)
            .chain(self.definitions.type_names())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    // ---- Registration ----

    /// Bind a root to its document and queue an initial load.
    ///
    /// Without an explicit path the document that provided the root's type
    /// is used.
    pub fn register(&mut self, mut binding: RootBinding) -> Result<RootId, ReloadError> {
        let path = match binding.path.clone() {
            Some(path) => path,
            None => self
                .definitions
                .get(&binding.type_name)
                .map(|entry| entry.path.clone())
                .ok_or_else(|| ReloadError::UnknownType(binding.type_name.clone()))?,
        };
        binding.path = Some(path.clone());

        if !self.watches.contains_key(&path) {
            let watcher = self.spawn_watcher(&path)?;
            self.watches.insert(
                path.clone(),
                PathWatch {
                    watcher,
                    subscribers: Vec::new(),
                },
            );
        }

        let type_name = binding.type_name.clone();
        let id = self.roots.insert(RootEntry {
            binding,
            path: path.clone(),
            attempted: HashMap::new(),
        });
        if let Some(watch) = self.watches.get_mut(&path) {
            watch.subscribers.push(id);
        }
        info!(%type_name, path = %path.display(), "registered root");
        self.queue(path);
        Ok(id)
    }

    /// Remove a root. The path's watcher stops, and its definitions are
    /// dropped unless discovery loaded them, when the last root using it
    /// leaves.
    pub fn unregister(&mut self, id: RootId) -> Result<(), ReloadError> {
        let entry = self.roots.remove(id).ok_or(ReloadError::UnknownRoot(id))?;
        let path = entry.path;
        let now_unused = match self.watches.get_mut(&path) {
            Some(watch) => {
                watch.subscribers.retain(|&root| root != id);
                watch.subscribers.is_empty()
            }
            None => false,
        };
        if now_unused {
            self.watches.remove(&path);
            let dropped = if self.discovered.contains(&path) {
                Vec::new()
            } else {
                self.definitions.remove_path(&path)
            };
            self.diagnostics.clear(&path);
            self.broken.remove(&path);
            debug!(path = %path.display(), ?dropped, "stopped watching");
        }
        Ok(())
    }

    /// Unregister roots whose node left the tree.
    fn prune(&mut self) {
        let gone: Vec<RootId> = self
            .roots
            .iter()
            .filter(|(_, entry)| !self.tree.contains(entry.binding.node))
            .map(|(id, _)| id)
            .collect();
        for id in gone {
            debug!(?id, "pruning removed root");
            let _ = self.unregister(id);
        }
    }

    /// Watch a shared style document and load it now.
    pub fn watch_styles(&mut self, path: impl Into<PathBuf>) -> Result<(), ReloadError> {
        let path = path.into();
        if self.style_watches.contains_key(&path) {
            return Ok(());
        }
        let watcher = self.spawn_watcher(&path)?;
        self.style_watches.insert(
            path.clone(),
            StyleWatch {
                watcher,
                group: None,
            },
        );
        self.handle(ReloadEvent::Changed(path));
        Ok(())
    }

    /// Start a watcher for `path` if watching is enabled. A watcher that
    /// can't attach is recorded against `path`.
    fn spawn_watcher(&mut self, path: &Path) -> Result<Option<FileWatcher>, ReloadError> {
        if !self.config.watch_files {
            return Ok(None);
        }
        FileWatcher::spawn(path, self.config.poll_interval, self.sender.clone())
            .map(Some)
            .map_err(|err| self.record(err.into()))
    }

    /// Record an error in the diagnostics under the file it belongs to.
    fn record(&mut self, err: ReloadError) -> ReloadError {
        if let Some(path) = err.path() {
            warn!(path = %path.display(), %err, "recorded");
            self.diagnostics.record(path, &err);
        }
        err
    }

    fn queue(&self, path: PathBuf) {
        // The receiver lives in `self`, so the channel can't be closed here.
        let _ = self.sender.send(ReloadEvent::Changed(path));
    }

    /// Queue a change for every watched document and style path.
    pub fn reload_all(&mut self) {
        self.prune();
        let mut paths: Vec<PathBuf> = self
            .style_watches
            .keys()
            .chain(self.watches.keys())
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        info!(count = paths.len(), "reloading everything");
        for path in paths {
            self.queue(path);
        }
    }

    // ---- Discovery and previews ----

    /// Register every definition found under `dir` whose type is not
    /// compiled into the host. Returns the newly known type names, sorted.
    ///
    /// Documents that fail to parse, and directories that can't be read,
    /// are recorded in the diagnostics.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn discover(&mut self, dir: &Path) -> Result<Vec<String>, ReloadError> {
        let mut documents = Vec::new();
        self.collect_documents(dir, &mut documents)
            .map_err(|err| self.record(err))?;
        documents.sort();

        let mut found = Vec::new();
        for path in documents {
            let definition = match read_document(&path) {
                Ok(definition) => definition,
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping document");
                    self.diagnostics.record(&path, &err);
                    self.broken.insert(path);
                    continue;
                }
            };
            if self.config.compiled_types.contains(&definition.type_name) {
                continue;
            }
            for nested in definition.component_definitions() {
                if !self.definitions.contains(&nested.type_name) {
                    found.push(nested.type_name.clone());
                }
                self.definitions.insert(nested.clone(), &path);
            }
            self.diagnostics.clear(&path);
            self.broken.remove(&path);
            self.discovered.insert(path);
        }
        found.sort();
        info!(count = found.len(), "discovered definitions");
        Ok(found)
    }

    fn collect_documents(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ReloadError> {
        let io_error = |source| ReloadError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_dir() {
                self.collect_documents(&path, out)?;
            } else if self.config.is_document(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    /// Create a preview root for any known type and apply it.
    pub fn instantiate(&mut self, type_name: &str) -> Result<RootId, ReloadError> {
        if !self.definitions.contains(type_name) {
            return Err(ReloadError::UnknownType(type_name.to_string()));
        }
        let element = self
            .registry
            .create(type_name)
            .unwrap_or_else(|| Box::new(GenericElement::anonymous(type_name)));
        let node = self.tree.insert(ViewNode::new(element));
        let id = match self.register(RootBinding::anonymous(node, type_name)) {
            Ok(id) => id,
            Err(err) => {
                self.tree.remove(node);
                return Err(err);
            }
        };
        if let Err(err) = self.apply_root(id) {
            let _ = self.unregister(id);
            self.tree.remove(node);
            return Err(err);
        }
        Ok(id)
    }

    // ---- Dispatch ----

    /// Handle one event. Errors are recorded in the diagnostics keyed by
    /// the document they belong to.
    #[instrument(skip_all, fields(path = %event.path().display()))]
    pub fn handle(&mut self, event: ReloadEvent) -> ReloadOutcome {
        self.prune();
        let ReloadEvent::Changed(path) = event;

        let loaded = if self.style_watches.contains_key(&path) {
            self.reload_styles(&path)
        } else if self.watches.contains_key(&path) {
            self.reload_document(&path)
        } else {
            debug!("no subscribers; ignored");
            return ReloadOutcome {
                path,
                ..ReloadOutcome::default()
            };
        };

        if let Err(err) = loaded {
            error!(%err, "reload failed");
            self.diagnostics.record(&path, &err);
            self.broken.insert(path.clone());
            return ReloadOutcome {
                path,
                ..ReloadOutcome::default()
            };
        }
        self.broken.remove(&path);
        self.diagnostics.clear(&path);

        let mut outcome = self.reapply_stale(&path);
        outcome.path = path;
        info!(
            reapplied = outcome.reapplied.len(),
            failed = outcome.failed.len(),
            "reload handled"
        );
        outcome
    }

    fn reload_document(&mut self, path: &Path) -> Result<(), ReloadError> {
        let definition = read_document(path)?;
        let stored = self.definitions.insert_document(&definition, path);
        debug!(?stored, "definitions stored");
        Ok(())
    }

    fn reload_styles(&mut self, path: &Path) -> Result<(), ReloadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReloadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let group = parse_style_group(&text).map_err(|source| ReloadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let name = group.name.clone();
        if let Some(watch) = self.style_watches.get_mut(path) {
            if let Some(previous) = watch.group.replace(name.clone()) {
                if previous != name {
                    self.styles.remove_group(&previous);
                }
            }
        }
        self.styles.insert_group(group);
        self.definitions.bump_all();
        debug!(group = %name, "style group loaded");
        Ok(())
    }

    /// Re-apply the roots bound to `changed`, and every root whose
    /// dependencies changed since its last attempt. A root whose last apply
    /// failed is left alone until one of those happens.
    fn reapply_stale(&mut self, changed: &Path) -> ReloadOutcome {
        let stale: Vec<RootId> = self
            .roots
            .iter()
            .filter(|(_, entry)| {
                entry.path == changed
                    || entry
                        .attempted
                        .iter()
                        .any(|(name, &generation)| self.definitions.generation(name) != generation)
            })
            .map(|(id, _)| id)
            .collect();

        let mut outcome = ReloadOutcome::default();
        let mut failed_paths = HashSet::new();
        for id in stale {
            let Some(path) = self.roots.get(id).map(|entry| entry.path.clone()) else {
                continue;
            };
            match self.apply_root(id) {
                Ok(()) => outcome.reapplied.push(id),
                Err(err) => {
                    error!(?id, %err, "apply failed");
                    self.diagnostics.record(&path, &err);
                    failed_paths.insert(path);
                    outcome.failed.push(id);
                }
            }
        }
        for id in &outcome.reapplied {
            if let Some(entry) = self.roots.get(*id) {
                if !failed_paths.contains(&entry.path) && !self.broken.contains(&entry.path) {
                    self.diagnostics.clear(&entry.path);
                }
            }
        }
        outcome
    }

    fn apply_root(&mut self, id: RootId) -> Result<(), ReloadError> {
        let Self {
            tree,
            registry,
            styles,
            definitions,
            roots,
            ..
        } = self;
        let (registry, styles, definitions) = (&*registry, &*styles, &*definitions);
        let entry = roots.get_mut(id).ok_or(ReloadError::UnknownRoot(id))?;
        let type_name = entry.binding.type_name.clone();
        entry.attempted = definitions.dependencies(&type_name);
        let definition = definitions
            .get(&type_name)
            .map(|entry| &entry.definition)
            .ok_or_else(|| ReloadError::UnknownType(type_name.clone()))?;

        let report = LiveApplier::new(registry, styles)
            .with_definitions(definitions)
            .apply(tree, &mut entry.binding, definition)
            .map_err(|source| ReloadError::Apply {
                type_name: type_name.clone(),
                source,
            })?;
        debug!(?id, definitions = ?report.definitions, "applied");
        Ok(())
    }

    // ---- Event loop ----

    /// Handle every queued event without waiting. Returns the outcomes in
    /// order.
    pub fn process_pending(&mut self) -> Vec<ReloadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            outcomes.push(self.handle(event));
        }
        outcomes
    }

    /// Wait for the next event and handle it.
    pub async fn next(&mut self) -> Option<ReloadOutcome> {
        let event = self.receiver.recv().await?;
        Some(self.handle(event))
    }

    /// Handle events until `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.receiver.recv() => match event {
                    Some(event) => {
                        self.handle(event);
                    }
                    None => break,
                },
            }
        }
        debug!("reload loop stopped");
    }

    /// Handle events for as long as the manager exists.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending()).await;
    }
}

fn read_document(path: &Path) -> Result<crate::markup::ComponentDefinition, ReloadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReloadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definition(&text).map_err(|source| ReloadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
