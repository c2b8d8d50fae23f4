//! Undo/redo history with bounded size and memory.
//!
//! The undo stack holds executed commands (oldest first), the redo stack holds
//! undone ones (next to redo last). Executing a new command clears the redo
//! stack. When a ceiling is exceeded the oldest undo entries are evicted.
//!
//! Periodic `StateSnapshot`s are tagged with an absolute history position
//! (commands evicted so far plus the undo depth), so `rebuild` can restore
//! the nearest one and replay recorded changes to reach the current position.

use crate::core::config::HistoryConfig;
use crate::voxel::edit::change::Direction;
use crate::voxel::edit::command::Command;
use crate::voxel::edit::composite::CompositeCommand;
use crate::voxel::edit::error::EditError;
use crate::voxel::edit::snapshot::StateSnapshot;
use crate::voxel::store::VoxelDataStore;

/// Notification sent to the history listener
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryEvent {
    Executed { name: String },
    Undone { name: String },
    Redone { name: String },
    Cleared,
    TransactionStarted { name: String },
    TransactionCommitted { name: String, commands: usize },
    TransactionCancelled { name: String },
    /// Oldest entries dropped to respect the ceilings
    Evicted { count: usize },
    /// Still over the memory ceiling with only the newest entry left
    MemoryPressure { used: usize, limit: usize },
}

pub type HistoryListener = Box<dyn FnMut(&HistoryEvent) + Send>;

struct Transaction {
    name: String,
    commands: Vec<Command>,
}

pub struct HistoryManager {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    max_entries: usize,
    max_memory: usize,
    snapshot_interval: usize,
    compression_enabled: bool,
    /// Commands dropped off the bottom of the undo stack so far
    evicted: usize,
    since_snapshot: usize,
    /// Sorted by position
    snapshots: Vec<(usize, StateSnapshot)>,
    transaction: Option<Transaction>,
    listener: Option<HistoryListener>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl std::fmt::Debug for HistoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryManager")
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .field("position", &self.position())
            .field("snapshots", &self.snapshots.len())
            .field("in_transaction", &self.transaction.is_some())
            .finish()
    }
}

impl HistoryManager {
    /// Empty history using the configured limits
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: config.max_entries.max(1),
            max_memory: config.max_memory_bytes,
            snapshot_interval: config.snapshot_interval.max(1),
            compression_enabled: config.compression_enabled,
            evicted: 0,
            since_snapshot: 0,
            snapshots: Vec::new(),
            transaction: None,
            listener: None,
        }
    }

    /// Install a callback that receives every `HistoryEvent`
    pub fn set_listener(&mut self, listener: HistoryListener) {
        self.listener = Some(listener);
    }

    /// Remove the listener
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    fn emit(&mut self, event: HistoryEvent) {
        if let Some(listener) = &mut self.listener {
            listener(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Limits
    // -----------------------------------------------------------------------

    /// Maximum number of undo entries
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Takes effect on the next execution or `enforce_limits` call.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
    }

    /// Command memory ceiling in bytes
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    /// Takes effect on the next execution or `enforce_limits` call.
    pub fn set_max_memory(&mut self, bytes: usize) {
        self.max_memory = bytes;
    }

    /// Recorded commands between snapshots
    pub fn snapshot_interval(&self) -> usize {
        self.snapshot_interval
    }

    /// Change the snapshot interval (at least 1)
    pub fn set_snapshot_interval(&mut self, interval: usize) {
        self.snapshot_interval = interval.max(1);
    }

    /// Whether `optimize_memory` compresses commands
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    /// Disabling decompresses every stored command.
    pub fn set_compression_enabled(&mut self, enabled: bool) -> Result<(), EditError> {
        self.compression_enabled = enabled;
        if !enabled {
            for cmd in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
                cmd.decompress()?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// True if an entry can be undone now
    pub fn can_undo(&self) -> bool {
        self.transaction.is_none() && !self.undo_stack.is_empty()
    }

    /// True if an entry can be redone now
    pub fn can_redo(&self) -> bool {
        self.transaction.is_none() && !self.redo_stack.is_empty()
    }

    /// Number of entries on the undo stack
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries on the redo stack
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Absolute position: commands evicted plus the undo depth
    pub fn position(&self) -> usize {
        self.evicted + self.undo_stack.len()
    }

    /// Command memory estimate of both stacks and any open transaction.
    /// Snapshots are reported separately.
    pub fn memory_usage(&self) -> usize {
        let tx = self
            .transaction
            .as_ref()
            .map_or(0, |t| t.commands.iter().map(Command::memory_usage).sum());
        self.stack_memory() + tx
    }

    fn stack_memory(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(Command::memory_usage)
            .sum()
    }

    /// Compressed size of all snapshots in bytes
    pub fn snapshot_memory_usage(&self) -> usize {
        self.snapshots.iter().map(|(_, s)| s.memory_usage()).sum()
    }

    /// Number of snapshots held
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Names of undoable commands, most recent first
    pub fn undo_history(&self) -> Vec<&str> {
        self.undo_stack.iter().rev().map(Command::name).collect()
    }

    /// Names of redoable commands, next to redo first
    pub fn redo_history(&self) -> Vec<&str> {
        self.redo_stack.iter().rev().map(Command::name).collect()
    }

    /// Most recent undoable entry
    pub fn last_executed(&self) -> Option<&Command> {
        self.undo_stack.last()
    }

    /// True between `begin_transaction` and its end or cancel
    pub fn is_in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    // -----------------------------------------------------------------------
    // Execute / undo / redo
    // -----------------------------------------------------------------------

    /// Execute a command and record it.
    ///
    /// On failure nothing is recorded and the error is returned. Inside a
    /// transaction the command is buffered instead of recorded.
    pub fn execute_command(&mut self, command: impl Into<Command>, store: &mut VoxelDataStore) -> Result<(), EditError> {
        let mut command = command.into();

        // Base state for rebuild, kept only if the command succeeds
        let tx_clean = self.transaction.as_ref().is_none_or(|t| t.commands.is_empty());
        let base = (self.snapshots.is_empty() && tx_clean).then(|| StateSnapshot::capture(store));

        if let Err(e) = command.execute(store) {
            log::warn!("Command '{}' failed: {}", command.name(), e);
            return Err(e);
        }
        if let Some(snapshot) = base {
            self.insert_snapshot(snapshot);
        }

        let name = command.name().to_string();
        if let Some(tx) = &mut self.transaction {
            tx.commands.push(command);
        } else {
            self.record(command, store);
        }
        self.emit(HistoryEvent::Executed { name });
        Ok(())
    }

    /// Push an executed command, merging with the top entry when possible.
    fn record(&mut self, command: Command, store: &mut VoxelDataStore) {
        let position = self.position();
        self.redo_stack.clear();

        let unmerged = match self.undo_stack.last_mut() {
            Some(top) => top.merge(command).err(),
            None => Some(command),
        };

        match unmerged {
            Some(command) => {
                self.snapshots.retain(|(p, _)| *p <= position);
                self.undo_stack.push(command);
            }
            // The top entry changed, so a snapshot taken at its position is stale
            None => self.snapshots.retain(|(p, _)| *p < position),
        }

        self.since_snapshot += 1;
        if self.since_snapshot >= self.snapshot_interval || self.snapshots.is_empty() {
            self.capture_snapshot(store);
        }

        self.enforce_limits(store);
    }

    /// Undo the most recent command.
    ///
    /// Returns `Ok(false)` when there is nothing to undo or a transaction is
    /// open. A command that fails to undo stays on the undo stack.
    pub fn undo(&mut self, store: &mut VoxelDataStore) -> Result<bool, EditError> {
        if self.transaction.is_some() {
            log::debug!("Undo ignored while a transaction is open");
            return Ok(false);
        }
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = command.undo(store) {
            log::warn!("Undo of '{}' failed: {}", command.name(), e);
            self.undo_stack.push(command);
            return Err(e);
        }

        let name = command.name().to_string();
        self.redo_stack.push(command);
        self.emit(HistoryEvent::Undone { name });
        Ok(true)
    }

    /// Re-execute the most recently undone command.
    pub fn redo(&mut self, store: &mut VoxelDataStore) -> Result<bool, EditError> {
        if self.transaction.is_some() {
            log::debug!("Redo ignored while a transaction is open");
            return Ok(false);
        }
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };

        if let Err(e) = command.execute(store) {
            log::warn!("Redo of '{}' failed: {}", command.name(), e);
            self.redo_stack.push(command);
            return Err(e);
        }

        let name = command.name().to_string();
        self.undo_stack.push(command);
        self.emit(HistoryEvent::Redone { name });
        Ok(true)
    }

    /// Drop both stacks, every snapshot and any open transaction. The store
    /// is left as it is.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.snapshots.clear();
        self.transaction = None;
        self.evicted = 0;
        self.since_snapshot = 0;
        self.emit(HistoryEvent::Cleared);
    }

    // -----------------------------------------------------------------------
    // Memory management
    // -----------------------------------------------------------------------

    /// Compress stored commands when compression is enabled. Returns the
    /// number of bytes saved.
    pub fn optimize_memory(&mut self) -> Result<usize, EditError> {
        if !self.compression_enabled {
            return Ok(0);
        }
        let before = self.stack_memory();
        for cmd in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            cmd.compress()?;
        }
        let saved = before.saturating_sub(self.stack_memory());
        if saved > 0 {
            log::debug!("Compressed history, saved {} bytes", saved);
        }
        Ok(saved)
    }

    /// Evict the oldest entries until both ceilings hold. The newest entry
    /// is never evicted.
    pub fn enforce_limits(&mut self, store: &mut VoxelDataStore) {
        if self.stack_memory() > self.max_memory {
            if let Err(e) = self.optimize_memory() {
                log::warn!("History compression failed: {}", e);
            }
        }

        let mut count = self.undo_stack.len().saturating_sub(self.max_entries);
        let mut used = self.stack_memory() - self.undo_stack[..count].iter().map(Command::memory_usage).sum::<usize>();
        while used > self.max_memory && self.undo_stack.len() - count > 1 {
            used -= self.undo_stack[count].memory_usage();
            count += 1;
        }

        if count > 0 {
            self.evict(count, store);
        }

        if used > self.max_memory {
            let limit = self.max_memory;
            self.emit(HistoryEvent::MemoryPressure { used, limit });
        }
    }

    fn evict(&mut self, count: usize, store: &mut VoxelDataStore) {
        let new_base = self.evicted + count;
        if !self.snapshots.iter().any(|(p, _)| *p >= new_base) {
            self.capture_snapshot(store);
        }

        self.undo_stack.drain(..count);
        self.evicted = new_base;
        self.snapshots.retain(|(p, _)| *p >= new_base);

        log::debug!("Evicted {} history entries (base position {})", count, new_base);
        self.emit(HistoryEvent::Evicted { count });
    }

    fn capture_snapshot(&mut self, store: &VoxelDataStore) {
        self.insert_snapshot(StateSnapshot::capture(store));
    }

    /// Tag a snapshot of the current state with the current position.
    fn insert_snapshot(&mut self, snapshot: StateSnapshot) {
        let position = self.position();
        log::debug!(
            "Captured snapshot at position {} ({} voxels, {} bytes)",
            position,
            snapshot.voxel_count(),
            snapshot.memory_usage()
        );

        self.snapshots.retain(|(p, _)| *p != position);
        let at = self.snapshots.partition_point(|(p, _)| *p < position);
        self.snapshots.insert(at, (position, snapshot));
        self.since_snapshot = 0;
    }

    /// Restore the store to the current history position from the nearest
    /// snapshot plus recorded changes.
    pub fn rebuild(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        if self.transaction.is_some() {
            return Err(EditError::TransactionActive);
        }

        let position = self.position();
        let (snap_pos, snapshot) = self
            .snapshots
            .iter()
            .min_by_key(|(p, _)| p.abs_diff(position))
            .ok_or(EditError::NoSnapshot)?;
        let snap_pos = *snap_pos;

        snapshot.restore(store)?;

        if snap_pos <= position {
            for command in &mut self.undo_stack[snap_pos - self.evicted..] {
                command.replay(store, Direction::Forward)?;
            }
        } else {
            // redo_stack[len - k] sits at position + k
            let len = self.redo_stack.len();
            for k in (1..=snap_pos - position).rev() {
                self.redo_stack[len - k].replay(store, Direction::Backward)?;
            }
        }

        log::debug!("Rebuilt state at position {} from snapshot at {}", position, snap_pos);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Group subsequently executed commands into one undo entry.
    pub fn begin_transaction(&mut self, name: impl Into<String>) -> Result<(), EditError> {
        if self.transaction.is_some() {
            return Err(EditError::TransactionActive);
        }
        let name = name.into();
        self.transaction = Some(Transaction {
            name: name.clone(),
            commands: Vec::new(),
        });
        self.emit(HistoryEvent::TransactionStarted { name });
        Ok(())
    }

    /// Commit the open transaction as one entry. Returns `Ok(false)` when it
    /// executed nothing, in which case nothing is recorded.
    pub fn end_transaction(&mut self, store: &mut VoxelDataStore) -> Result<bool, EditError> {
        let tx = self.transaction.take().ok_or(EditError::NoTransaction)?;
        let count = tx.commands.len();
        let committed = count > 0;

        if committed {
            let group = CompositeCommand::from_executed(store.id(), tx.name.clone(), tx.commands);
            self.record(Command::Group(group), store);
        }

        self.emit(HistoryEvent::TransactionCommitted {
            name: tx.name,
            commands: count,
        });
        Ok(committed)
    }

    /// Undo everything executed since `begin_transaction` and discard it.
    pub fn cancel_transaction(&mut self, store: &mut VoxelDataStore) -> Result<(), EditError> {
        let tx = self.transaction.take().ok_or(EditError::NoTransaction)?;

        let mut first_err = None;
        for mut command in tx.commands.into_iter().rev() {
            if let Err(e) = command.undo(store) {
                log::error!("Cancelling '{}': undo of '{}' failed: {}", tx.name, command.name(), e);
                first_err.get_or_insert(e);
            }
        }

        self.emit(HistoryEvent::TransactionCancelled { name: tx.name });
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
