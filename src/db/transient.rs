use std::collections::HashMap;

use crate::common::{address::Address, word::Word};

type Layer = HashMap<(Address, Word), Word>;

/// EIP-1153 transient storage: `(address, slot) -> word`, checkpointed like
/// the account overlays but with no backend and a lifetime of one
/// transaction. Absent entries read as zero.
#[derive(Debug)]
pub struct TransientDB {
    layers: Vec<Layer>,
}

impl Default for TransientDB {
    fn default() -> Self {
        Self {
            layers: vec![Layer::new()],
        }
    }
}

impl TransientDB {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address, slot: &Word) -> Word {
        for layer in self.layers.iter().rev() {
            if let Some(value) = layer.get(&(*address, *slot)) {
                return *value;
            }
        }
        Word::zero()
    }

    pub fn set(&mut self, address: Address, slot: Word, value: Word) {
        self.layers
            .last_mut()
            .expect("transient storage always has a root layer")
            .insert((address, slot), value);
    }

    pub fn checkpoint(&mut self) -> usize {
        self.layers.push(Layer::new());
        self.layers.len() - 1
    }

    pub fn commit(&mut self, id: usize) -> eyre::Result<()> {
        if id == 0 || id != self.layers.len() - 1 {
            eyre::bail!("transient commit of non-top checkpoint {id}");
        }
        let top = self.layers.pop().expect("depth checked above");
        let parent = self.layers.last_mut().expect("root layer remains");
        parent.extend(top);
        Ok(())
    }

    pub fn discard(&mut self, id: usize) -> eyre::Result<()> {
        if id == 0 || id > self.layers.len() - 1 {
            eyre::bail!("transient discard of unknown checkpoint {id}");
        }
        self.layers.truncate(id);
        Ok(())
    }

    /// Wipe everything at the end of the transaction.
    pub fn clear(&mut self) {
        self.layers = vec![Layer::new()];
    }

    pub fn is_clear(&self) -> bool {
        self.layers.len() == 1 && self.layers[0].is_empty()
    }
}
