//! Périphérique de blocs.
//!
//! Le système de fichiers ne voit le volume qu'à travers [`BlockDevice`] :
//! des lectures et écritures de blocs entiers, numérotés de 0 à N-1.
//! [`MemDisk`] est l'implémentation utilisée par la CLI et les tests :
//! un dump complet du volume dans un `Vec<u8>`, que l'appelant peut
//! sauvegarder dans un fichier image (`disk.img`) pour le rendre persistant.

use alloc::vec;
use alloc::vec::Vec;

use crate::{FsError, BLOCK_SIZE};

/// Vue abstraite d'un volume : N blocs de [`BLOCK_SIZE`] octets.
///
/// Les accès se font toujours par bloc entier. Une implémentation doit
/// retourner [`FsError::Io`] pour tout numéro de bloc hors du volume.
pub trait BlockDevice {
    /// Nombre de blocs du volume.
    fn block_count(&self) -> u16;

    /// Lit le bloc `no` dans `buf`.
    fn read_block(&self, no: u16, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), FsError>;

    /// Écrit `buf` dans le bloc `no`.
    fn write_block(&mut self, no: u16, buf: &[u8; BLOCK_SIZE]) -> Result<(), FsError>;
}

/// Volume entièrement en mémoire.
///
/// Le contenu est un dump brut : l'octet `i` du volume est `bytes[i]`.
/// C'est le format d'un fichier image, ce qui permet à la CLI de charger
/// et de réécrire `disk.img` sans conversion.
#[derive(Debug, Clone)]
pub struct MemDisk {
    bytes: Vec<u8>,
}

impl MemDisk {
    /// Crée un volume vierge (rempli de zéros) de `block_count` blocs.
    pub fn new(block_count: u16) -> Self {
        Self { bytes: vec![0u8; block_count as usize * BLOCK_SIZE] }
    }

    /// Reconstruit un volume depuis un dump brut (ex: le contenu d'un
    /// fichier image). La taille doit être un multiple de [`BLOCK_SIZE`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FsError> {
        if bytes.is_empty() || bytes.len() % BLOCK_SIZE != 0 {
            return Err(FsError::InvalidArgument);
        }
        if bytes.len() / BLOCK_SIZE > u16::MAX as usize {
            return Err(FsError::InvalidArgument);
        }
        Ok(Self { bytes })
    }

    /// Dump brut du volume, pour sauvegarde dans un fichier image.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consomme le volume et rend le dump brut.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, no: u16) -> Result<core::ops::Range<usize>, FsError> {
        if no >= self.block_count() {
            return Err(FsError::Io);
        }
        let start = no as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> u16 {
        (self.bytes.len() / BLOCK_SIZE) as u16
    }

    fn read_block(&self, no: u16, buf: &mut [u8; BLOCK_SIZE]) -> Result<(), FsError> {
        let range = self.range(no)?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_block(&mut self, no: u16, buf: &[u8; BLOCK_SIZE]) -> Result<(), FsError> {
        let range = self.range(no)?;
        self.bytes[range].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_round_trip() {
        let mut disk = MemDisk::new(4);
        let mut block = [0u8; BLOCK_SIZE];
        block[0] = 0xAB;
        block[BLOCK_SIZE - 1] = 0xCD;

        disk.write_block(2, &block).unwrap();

        let mut out = [0u8; BLOCK_SIZE];
        disk.read_block(2, &mut out).unwrap();
        assert_eq!(out[0], 0xAB);
        assert_eq!(out[BLOCK_SIZE - 1], 0xCD);
    }

    #[test]
    fn out_of_range_is_io_error() {
        let mut disk = MemDisk::new(4);
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(disk.read_block(4, &mut buf).unwrap_err(), FsError::Io);
        assert_eq!(disk.write_block(100, &buf).unwrap_err(), FsError::Io);
    }

    #[test]
    fn from_bytes_rejects_partial_block() {
        let err = MemDisk::from_bytes(vec![0u8; BLOCK_SIZE + 1]).unwrap_err();
        assert_eq!(err, FsError::InvalidArgument);
    }

    #[test]
    fn from_bytes_keeps_content() {
        let mut bytes = vec![0u8; 2 * BLOCK_SIZE];
        bytes[BLOCK_SIZE] = 42;
        let disk = MemDisk::from_bytes(bytes).unwrap();
        assert_eq!(disk.block_count(), 2);

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read_block(1, &mut buf).unwrap();
        assert_eq!(buf[0], 42);
    }
}
