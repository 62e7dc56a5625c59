//! Blocs de répertoire.
//!
//! Un répertoire tient dans un seul bloc : 64 slots de 64 octets. Le slot 0
//! est réservé : dans la racine c'est l'entrée propre `/` (qui porte aussi la
//! taille totale du volume), ailleurs c'est l'entrée `..` qui pointe sur le
//! bloc du parent. Les slots 1 à 63 portent les enfants.
//!
//! Le bloc est lu en entier, modifié en mémoire, puis réécrit en entier.

extern crate alloc;

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::dir_entry::DirEntry;
use crate::{FsError, BLOCK_SIZE, ENTRIES_PER_BLOCK, ENTRY_SIZE, NAME_MAX, ROOT_BLOCK};

/// Bloc de répertoire décodé.
#[derive(Debug, Clone)]
pub struct DirBlock {
    slots: Vec<Option<DirEntry>>,
}

impl DirBlock {
    /// Bloc racine vierge : slot 0 = entrée propre `/`, taille 0.
    pub fn new_root() -> Self {
        let mut slots = vec![None; ENTRIES_PER_BLOCK];
        slots[0] = Some(DirEntry::new_dir(String::from("/"), ROOT_BLOCK));
        Self { slots }
    }

    /// Bloc d'un nouveau sous-répertoire : slot 0 = `..` vers le parent.
    pub fn new_subdir(parent_blk: u16) -> Self {
        let mut slots = vec![None; ENTRIES_PER_BLOCK];
        slots[0] = Some(DirEntry::new_dir(String::from(".."), parent_blk));
        Self { slots }
    }

    /// Décode un bloc brut.
    pub fn from_bytes(buf: &[u8; BLOCK_SIZE]) -> Self {
        let slots = buf.chunks_exact(ENTRY_SIZE).map(DirEntry::parse).collect();
        Self { slots }
    }

    /// Encode le bloc vers sa forme brute. Les slots libres sont zéro.
    pub fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(entry) = slot {
                buf[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE].copy_from_slice(&entry.encode());
            }
        }
        buf
    }

    /// Entrée du slot 0 (`..` ou l'entrée propre de la racine).
    pub fn backlink(&self) -> Result<&DirEntry, FsError> {
        self.slots[0].as_ref().ok_or(FsError::Corrupted)
    }

    /// Variante mutable de [`DirBlock::backlink`].
    pub fn backlink_mut(&mut self) -> Result<&mut DirEntry, FsError> {
        self.slots[0].as_mut().ok_or(FsError::Corrupted)
    }

    /// Entrée d'un slot donné.
    pub fn get(&self, slot: usize) -> Option<&DirEntry> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    /// Variante mutable de [`DirBlock::get`].
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DirEntry> {
        self.slots.get_mut(slot).and_then(|s| s.as_mut())
    }

    /// Cherche `name` parmi les slots 1..63 (le slot 0 n'est jamais un
    /// enfant). Comparaison octet à octet.
    pub fn find(&self, name: &str) -> Option<(usize, &DirEntry)> {
        self.children_slots().find(|(_, e)| e.name == name)
    }

    /// Premier slot d'enfant dont le premier bloc est `blk`. Utilisé par la
    /// propagation des tailles pour retrouver l'entrée d'un sous-répertoire
    /// dans son parent.
    pub fn find_by_block(&self, blk: u16) -> Option<usize> {
        self.children_slots().find(|(_, e)| e.first_blk == blk).map(|(i, _)| i)
    }

    /// Premier slot libre parmi 1..63.
    pub fn first_free_slot(&self) -> Option<usize> {
        (1..ENTRIES_PER_BLOCK).find(|&i| self.slots[i].is_none())
    }

    /// Écrit `entry` dans le premier slot libre.
    pub fn insert(&mut self, entry: DirEntry) -> Result<usize, FsError> {
        let slot = self.first_free_slot().ok_or(FsError::DirectoryFull)?;
        self.slots[slot] = Some(entry);
        Ok(slot)
    }

    /// Libère un slot (remis à zéro à l'encodage).
    pub fn remove(&mut self, slot: usize) {
        debug_assert!(slot != 0, "le slot 0 est réservé");
        self.slots[slot] = None;
    }

    /// Renomme l'entrée d'un slot.
    pub fn rename(&mut self, slot: usize, new_name: &str) -> Result<(), FsError> {
        if new_name.len() > NAME_MAX {
            return Err(FsError::InvalidArgument);
        }
        let entry = self.get_mut(slot).ok_or(FsError::NotFound)?;
        entry.name = String::from(new_name);
        Ok(())
    }

    /// Enfants du répertoire (slots 1..63 en usage), dans l'ordre des slots.
    pub fn children(&self) -> impl Iterator<Item = &DirEntry> {
        self.children_slots().map(|(_, e)| e)
    }

    /// Vrai si aucun slot d'enfant n'est en usage.
    pub fn is_empty(&self) -> bool {
        self.children_slots().next().is_none()
    }

    fn children_slots(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots.iter().enumerate().skip(1).filter_map(|(i, s)| s.as_ref().map(|e| (i, e)))
    }
}
