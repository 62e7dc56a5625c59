//! Entrées de répertoire (format fixe de 64 octets).
//!
//! Layout sur disque, champs little-endian :
//!
//! ```text
//! off  0 : file_name[56]   (ASCII, complété par des NUL)
//! off 56 : size            (u32)
//! off 60 : first_blk       (u16)
//! off 62 : type            (u8, 0 = fichier, 1 = répertoire)
//! off 63 : access_rights   (u8, bits rwx)
//! ```
//!
//! Un slot dont le premier octet du nom vaut 0 est libre.

extern crate alloc;

use alloc::string::String;
use bitflags::bitflags;

use crate::{FsError, ENTRY_SIZE, NAME_MAX};

bitflags! {
    /// Droits d'accès d'une entrée, mêmes valeurs que le mode octal UNIX.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessRights: u8 {
        const READ = 0x04;
        const WRITE = 0x02;
        const EXECUTE = 0x01;
    }
}

impl AccessRights {
    /// Forme `rwx` avec un `-` pour chaque bit absent.
    pub fn letters(self) -> [char; 3] {
        [
            if self.contains(Self::READ) { 'r' } else { '-' },
            if self.contains(Self::WRITE) { 'w' } else { '-' },
            if self.contains(Self::EXECUTE) { 'x' } else { '-' },
        ]
    }
}

impl core::fmt::Display for AccessRights {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for c in self.letters() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Tag de type d'une entrée (octet 62).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    File = 0,
    Dir = 1,
}

impl EntryKind {
    fn from_byte(b: u8) -> Self {
        // Tout octet non nul est traité comme répertoire, seul 0 et 1
        // sont écrits par ce crate.
        if b == 0 {
            Self::File
        } else {
            Self::Dir
        }
    }
}

/// Entrée de répertoire décodée.
///
/// C'est une copie par valeur du slot de 64 octets : la modifier ne change
/// rien sur le disque tant que le bloc de répertoire n'est pas réécrit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Nom de l'entrée (1 à 55 caractères ASCII).
    pub name: String,
    /// Taille en octets pour un fichier ; pour un répertoire, somme des
    /// tailles des fichiers descendants, entretenue par deltas.
    pub size: u32,
    /// Premier bloc des données (contenu du fichier ou bloc de répertoire).
    pub first_blk: u16,
    /// Fichier ou répertoire.
    pub kind: EntryKind,
    /// Droits d'accès.
    pub rights: AccessRights,
}

impl DirEntry {
    /// Nouvelle entrée de fichier avec les droits par défaut `rwx`.
    pub fn new_file(name: String, size: u32, first_blk: u16) -> Self {
        Self { name, size, first_blk, kind: EntryKind::File, rights: AccessRights::all() }
    }

    /// Nouvelle entrée de répertoire avec les droits par défaut `rwx`.
    pub fn new_dir(name: String, first_blk: u16) -> Self {
        Self { name, size: 0, first_blk, kind: EntryKind::Dir, rights: AccessRights::all() }
    }

    /// Parse un slot de 64 octets. Retourne `None` si le slot est libre.
    pub fn parse(slot: &[u8]) -> Option<Self> {
        if slot.len() < ENTRY_SIZE || slot[0] == 0 {
            return None;
        }

        let name_raw = &slot[0..NAME_MAX + 1];
        let end = name_raw.iter().position(|&b| b == 0).unwrap_or(name_raw.len());
        let mut name = String::with_capacity(end);
        for &b in &name_raw[..end] {
            name.push(b as char);
        }

        let size = u32::from_le_bytes([slot[56], slot[57], slot[58], slot[59]]);
        let first_blk = u16::from_le_bytes([slot[60], slot[61]]);
        let kind = EntryKind::from_byte(slot[62]);
        let rights = AccessRights::from_bits_truncate(slot[63]);

        Some(Self { name, size, first_blk, kind, rights })
    }

    /// Encode l'entrée vers son slot de 64 octets.
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut slot = [0u8; ENTRY_SIZE];

        let bytes = self.name.as_bytes();
        let len = core::cmp::min(bytes.len(), NAME_MAX);
        slot[..len].copy_from_slice(&bytes[..len]);

        slot[56..60].copy_from_slice(&self.size.to_le_bytes());
        slot[60..62].copy_from_slice(&self.first_blk.to_le_bytes());
        slot[62] = self.kind as u8;
        slot[63] = self.rights.bits();
        slot
    }

    /// Indique si l'entrée est un répertoire.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    /// Indique si l'entrée est un fichier.
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Vérifie qu'un nom est utilisable pour une nouvelle entrée.
///
/// Règles : non vide, 55 octets au plus, ASCII uniquement, sans `/` ni NUL.
/// Les noms réservés `.` et `..` sont refusés.
pub fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name.len() > NAME_MAX {
        return Err(FsError::InvalidArgument);
    }
    if name == "." || name == ".." {
        return Err(FsError::InvalidArgument);
    }
    for b in name.bytes() {
        if !b.is_ascii() || b == b'/' || b == 0 {
            return Err(FsError::InvalidArgument);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn encode_parse_round_trip() {
        let entry = DirEntry {
            name: "notes.txt".to_string(),
            size: 5000,
            first_blk: 17,
            kind: EntryKind::File,
            rights: AccessRights::READ | AccessRights::WRITE,
        };

        let slot = entry.encode();
        let back = DirEntry::parse(&slot).expect("slot en usage");
        assert_eq!(back, entry);
    }

    #[test]
    fn layout_offsets_exacts() {
        let entry = DirEntry {
            name: "a".to_string(),
            size: 0x0403_0201,
            first_blk: 0x0605,
            kind: EntryKind::Dir,
            rights: AccessRights::all(),
        };
        let slot = entry.encode();

        assert_eq!(slot[0], b'a');
        assert_eq!(slot[1], 0); // padding NUL
        assert_eq!(&slot[56..60], &[0x01, 0x02, 0x03, 0x04]); // size LE
        assert_eq!(&slot[60..62], &[0x05, 0x06]); // first_blk LE
        assert_eq!(slot[62], 1); // TYPE_DIR
        assert_eq!(slot[63], 0x07); // rwx
    }

    #[test]
    fn slot_libre_parse_none() {
        let slot = [0u8; ENTRY_SIZE];
        assert!(DirEntry::parse(&slot).is_none());
    }

    #[test]
    fn nom_de_55_octets_accepte() {
        let name = "a".repeat(55);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn nom_de_56_octets_refuse() {
        let name = "a".repeat(56);
        assert_eq!(validate_name(&name).unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn noms_reserves_refuses() {
        assert!(validate_name(".").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn affichage_des_droits() {
        assert_eq!(AccessRights::all().letters(), ['r', 'w', 'x']);
        assert_eq!(AccessRights::READ.letters(), ['r', '-', '-']);
        assert_eq!(AccessRights::empty().letters(), ['-', '-', '-']);
    }
}
