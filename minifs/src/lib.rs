//! Mini système de fichiers à blocs sur un disque virtuel.
//!
//! Ce crate implémente un système de fichiers complet au-dessus d'un volume
//! de blocs de taille fixe :
//! - une FAT (table d'allocation) au bloc 1, une cellule de 16 bits par bloc,
//! - un arbre de répertoires encodé en blocs d'entrées de 64 octets,
//!   la racine au bloc 0,
//! - des fichiers de taille variable chaînés à travers la FAT,
//! - les douze commandes shell classiques (create, cat, ls, cp, mv, rm,
//!   append, mkdir, cd, pwd, chmod, format).
//!
//! Notes importantes :
//! - Le cœur est en `no_std` (hors tests) et n'utilise que `core` et `alloc`.
//! - Le volume est consommé à travers le trait [`BlockDevice`] ; les tests et
//!   la CLI utilisent [`MemDisk`], un volume entièrement en mémoire.
//! - Aucune journalisation sur disque : une erreur en cours d'opération peut
//!   laisser le volume dans un état incohérent (voir `append`, `mv`).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use thiserror::Error;

mod dir;
mod dir_entry;
mod disk;
mod fat;
mod fs;
mod path;

pub use dir::DirBlock;
pub use dir_entry::{validate_name, AccessRights, DirEntry, EntryKind};
pub use disk::{BlockDevice, MemDisk};
pub use fat::Fat;
pub use fs::FileSystem;

/// Taille d'un bloc en octets. Toute E/S disque se fait par bloc entier.
pub const BLOCK_SIZE: usize = 4096;

/// Nombre de cellules de la FAT (une cellule `i16` par bloc du volume).
pub const FAT_ENTRIES: usize = BLOCK_SIZE / 2;

/// Bloc réservé au répertoire racine.
pub const ROOT_BLOCK: u16 = 0;

/// Bloc réservé à la FAT elle-même.
pub const FAT_BLOCK: u16 = 1;

/// Cellule FAT : bloc libre.
pub const FAT_FREE: i16 = 0;

/// Cellule FAT : dernier bloc d'une chaîne.
pub const FAT_EOF: i16 = -1;

/// Taille d'une entrée de répertoire sur disque.
pub const ENTRY_SIZE: usize = 64;

/// Nombre de slots d'entrées dans un bloc de répertoire.
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / ENTRY_SIZE;

/// Longueur maximale d'un nom (55 caractères + le NUL terminal).
pub const NAME_MAX: usize = 55;

/// Erreurs possibles lors d'une opération sur le volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    /// Un composant du chemin ne correspond à aucune entrée.
    #[error("chemin introuvable")]
    NotFound,
    /// Le nom visé existe déjà dans le répertoire parent.
    #[error("le nom existe déjà")]
    AlreadyExists,
    /// L'opération attendait un fichier mais l'entrée est un répertoire.
    #[error("l'entrée est un répertoire")]
    IsDirectory,
    /// L'opération attendait un répertoire mais l'entrée est un fichier.
    #[error("l'entrée est un fichier")]
    IsFile,
    /// Le bit d'accès requis est absent.
    #[error("droits d'accès insuffisants")]
    PermissionDenied,
    /// La FAT ne peut pas fournir le nombre de blocs demandé.
    #[error("plus de blocs libres")]
    OutOfSpace,
    /// Le répertoire parent n'a plus de slot libre.
    #[error("répertoire plein")]
    DirectoryFull,
    /// Argument invalide (droits hors de 0..=7, nom trop long, chemin vide).
    #[error("argument invalide")]
    InvalidArgument,
    /// Chaîne FAT incohérente (cycle, cellule libre au milieu d'une chaîne).
    #[error("volume incohérent")]
    Corrupted,
    /// Erreur remontée par le périphérique de blocs.
    #[error("erreur du périphérique de blocs")]
    Io,
}

/// Division entière avec arrondi vers le haut.
pub(crate) const fn div_ceil(a: usize, b: usize) -> usize {
    if b == 0 {
        0
    } else {
        (a + b - 1) / b
    }
}
