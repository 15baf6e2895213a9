use std::collections::HashMap;

use crate::db::backend::{Backend, Table};

type Layer = HashMap<Vec<u8>, Option<Vec<u8>>>;

/// The journaling primitive: a stack of write layers over one backend
/// table. Layer zero is the pending root; each checkpoint pushes a fresh
/// layer on top. A `None` value is a deletion marker so that removals
/// shadow both older layers and the backend.
#[derive(Debug)]
pub struct Overlay {
    table: Table,
    layers: Vec<Layer>,
}

impl Overlay {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            layers: vec![Layer::new()],
        }
    }

    /// An overlay created mid-transaction starts with empty layers up to
    /// the current checkpoint depth so it discards in step with the rest.
    pub fn new_at_depth(table: Table, depth: usize) -> Self {
        Self {
            table,
            layers: (0..=depth).map(|_| Layer::new()).collect(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Checkpoint depth: zero at root, one per open checkpoint.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    /// Look a key up through the layers, newest first, falling through to
    /// the backend. A deletion marker reads as absent.
    pub fn get<B: Backend>(&self, backend: &B, key: &[u8]) -> eyre::Result<Option<Vec<u8>>> {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.get(key) {
                return Ok(value.clone());
            }
        }
        backend.get(&self.table, key)
    }

    /// Record a write (`Some`) or deletion (`None`) in the top layer. Writes
    /// that restate the current value are journaled all the same.
    pub fn set(&mut self, key: Vec<u8>, value: Option<Vec<u8>>) {
        self.layers
            .last_mut()
            .expect("overlay always has a root layer")
            .insert(key, value);
    }

    /// Open a checkpoint; the returned id is the new depth.
    pub fn checkpoint(&mut self) -> usize {
        self.layers.push(Layer::new());
        self.depth()
    }

    /// Fold the topmost layer into its parent. Only the topmost checkpoint
    /// may be committed.
    pub fn commit(&mut self, id: usize) -> eyre::Result<()> {
        if id == 0 || id != self.depth() {
            eyre::bail!("commit of non-top checkpoint {id} at depth {}", self.depth());
        }
        let top = self.layers.pop().expect("depth checked above");
        let parent = self.layers.last_mut().expect("root layer remains");
        for (key, value) in top {
            parent.insert(key, value);
        }
        Ok(())
    }

    /// Drop every layer from `id` up, restoring the state observed just
    /// before the matching `checkpoint` call.
    pub fn discard(&mut self, id: usize) -> eyre::Result<()> {
        if id == 0 || id > self.depth() {
            eyre::bail!("discard of unknown checkpoint {id} at depth {}", self.depth());
        }
        self.layers.truncate(id);
        Ok(())
    }

    /// Flush the pending root into the backend as one batched write plus
    /// one batched delete. Legal only with no open checkpoints.
    pub fn persist<B: Backend>(&mut self, backend: &mut B) -> eyre::Result<()> {
        if self.depth() != 0 {
            eyre::bail!("persist with {} open checkpoint(s)", self.depth());
        }
        let root = self.layers.last_mut().expect("root layer");
        let mut writes = Vec::new();
        let mut deletes = Vec::new();
        for (key, value) in root.drain() {
            match value {
                Some(value) => writes.push((key, value)),
                None => deletes.push(key),
            }
        }
        backend.batch_write(&self.table, writes)?;
        backend.batch_delete(&self.table, deletes)?;
        Ok(())
    }

    /// Every key with a pending write in any layer.
    pub fn pending_keys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<_> = self
            .layers
            .iter()
            .flat_map(|layer| layer.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// The pending root layer, for diffing after a top-level commit.
    pub fn root_layer(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.layers[0].iter()
    }
}
