//! Les opérations du système de fichiers.
//!
//! [`FileSystem`] possède le périphérique de blocs, l'unique copie en
//! mémoire de la FAT et le répertoire courant. Chaque opération suit le
//! même chemin : résolution du chemin, manipulation du bloc de répertoire,
//! allocation ou libération dans la FAT, écriture des données, puis
//! propagation des deltas de taille jusqu'à la racine.
//!
//! Ordre des écritures pour limiter la casse en cas d'erreur : les blocs de
//! données fraîchement alloués partent sur le disque avant la FAT et le
//! répertoire parent, et toutes les allocations sont vérifiées avant la
//! première écriture. Sans journal, une erreur d'E/S au milieu d'une
//! opération peut malgré tout laisser le volume incohérent.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::dir::DirBlock;
use crate::dir_entry::{validate_name, AccessRights, DirEntry};
use crate::disk::BlockDevice;
use crate::fat::Fat;
use crate::{div_ceil, path, FsError, BLOCK_SIZE, FAT_ENTRIES, FAT_EOF, ROOT_BLOCK};

/// Résultat d'une résolution de chemin : la copie de l'entrée trouvée et
/// l'adresse (bloc de répertoire, slot) où elle vit sur le disque.
struct Located {
    entry: DirEntry,
    parent_blk: u16,
    slot: usize,
}

/// Le système de fichiers monté sur un périphérique de blocs.
///
/// `cwd` est un chemin absolu canonique qui commence et finit par `/`
/// (la racine est le seul caractère `/`). La FAT est chargée au montage et
/// réécrite au bloc 1 après chaque opération qui la modifie.
pub struct FileSystem<D: BlockDevice> {
    disk: D,
    fat: Fat,
    cwd: String,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Monte un volume existant : charge la FAT depuis le bloc 1.
    ///
    /// Un volume jamais formaté se monte quand même (pour pouvoir lancer
    /// `format` dessus) mais est signalé dans le journal.
    pub fn mount(disk: D) -> Result<Self, FsError> {
        if disk.block_count() < 2 {
            return Err(FsError::InvalidArgument);
        }
        let fat = Fat::load(&disk)?;
        if fat.get(0) != FAT_EOF || fat.get(1) != FAT_EOF {
            log::warn!("volume non formaté : cellules réservées invalides");
        }
        Ok(Self { disk, fat, cwd: String::from("/") })
    }

    /// Rend le périphérique sous-jacent (pour sauvegarder l'image).
    pub fn into_device(self) -> D {
        self.disk
    }

    /// Accès en lecture au périphérique sous-jacent.
    pub fn device(&self) -> &D {
        &self.disk
    }

    /// Accès en lecture à la FAT en mémoire.
    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    /// Nombre de blocs encore libres.
    pub fn free_blocks(&self) -> usize {
        self.fat.free_count()
    }

    // ---------- les douze opérations ----------

    /// Formate le volume : tous les blocs à zéro, racine vierge au bloc 0,
    /// FAT réinitialisée, répertoire courant remis à `/`.
    pub fn format(&mut self) -> Result<(), FsError> {
        let zero = [0u8; BLOCK_SIZE];
        for blk in 0..self.disk.block_count() {
            self.disk.write_block(blk, &zero)?;
        }

        self.store_dir(ROOT_BLOCK, &DirBlock::new_root())?;
        self.fat = Fat::empty(self.disk.block_count());
        self.fat.flush(&mut self.disk)?;
        self.cwd = String::from("/");

        log::debug!("volume formaté, {} blocs libres", self.fat.free_count());
        Ok(())
    }

    /// Crée le fichier `path` avec le contenu `payload`.
    ///
    /// Échoue si le chemin existe déjà. Un contenu vide occupe quand même
    /// un bloc, qui porte la tête de chaîne `EOF`.
    pub fn create(&mut self, path: &str, payload: &[u8]) -> Result<(), FsError> {
        let (parent_blk, name) = self.resolve_parent(path)?;
        validate_name(&name)?;
        self.write_new_file(parent_blk, name, payload)
    }

    /// Lit le contenu du fichier `path` : exactement `size` octets, le
    /// remplissage du dernier bloc n'est jamais rendu.
    pub fn cat(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let loc = self.resolve(path)?;
        if loc.entry.is_dir() {
            return Err(FsError::IsDirectory);
        }
        if !loc.entry.rights.contains(AccessRights::READ) {
            return Err(FsError::PermissionDenied);
        }
        self.read_payload(loc.entry.first_blk, loc.entry.size as usize)
    }

    /// Liste les enfants du répertoire courant (sans le slot 0).
    /// Demande le droit d'exécution sur le répertoire courant.
    pub fn ls(&self) -> Result<Vec<DirEntry>, FsError> {
        let loc = self.resolve(self.cwd.as_str())?;
        if !loc.entry.rights.contains(AccessRights::EXECUTE) {
            return Err(FsError::PermissionDenied);
        }
        let dir = self.load_dir(loc.entry.first_blk)?;
        Ok(dir.children().cloned().collect())
    }

    /// Copie le fichier `src` vers le nouveau fichier `dst` (mêmes octets,
    /// droits par défaut `rwx`). Échoue si `dst` existe déjà.
    pub fn cp(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        let sloc = self.resolve(src)?;
        if sloc.entry.is_dir() {
            return Err(FsError::IsDirectory);
        }
        let (dparent_blk, dname) = self.resolve_parent(dst)?;
        validate_name(&dname)?;

        let payload = self.read_payload(sloc.entry.first_blk, sloc.entry.size as usize)?;
        self.write_new_file(dparent_blk, dname, &payload)
    }

    /// Déplace ou renomme `src`.
    ///
    /// - `dst` est un répertoire : `src` y est déplacé en gardant son nom ;
    ///   un fichier homonyme est écarté, un répertoire homonyme est fatal.
    /// - `dst` est un fichier : déplacement avec écrasement.
    /// - `dst` n'existe pas : renommage sur place vers le dernier composant
    ///   de `dst`.
    pub fn mv(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        let sloc = self.resolve(src)?;
        if sloc.slot == 0 {
            // la racine et les entrées `..` ne se déplacent pas
            return Err(FsError::InvalidArgument);
        }

        match self.resolve(dst) {
            Ok(dloc) if dloc.entry.is_dir() => self.move_into_dir(sloc, dloc.entry.first_blk),
            Ok(dloc) => self.move_onto_file(sloc, dloc),
            Err(FsError::NotFound) => self.rename_in_place(sloc, dst),
            Err(e) => Err(e),
        }
    }

    /// Supprime l'entrée `path` : libère sa chaîne, vide son slot et
    /// retranche sa taille de toute la lignée d'ancêtres.
    /// Un répertoire n'est supprimable que vide.
    pub fn rm(&mut self, path: &str) -> Result<(), FsError> {
        let loc = self.resolve(path)?;
        if loc.slot == 0 {
            // racine ou composant `..`
            return Err(FsError::InvalidArgument);
        }
        if loc.entry.is_dir() {
            let dir = self.load_dir(loc.entry.first_blk)?;
            if !dir.is_empty() {
                return Err(FsError::IsDirectory);
            }
        }

        self.fat.free_chain(loc.entry.first_blk)?;
        let mut parent = self.load_dir(loc.parent_blk)?;
        parent.remove(loc.slot);
        self.store_dir(loc.parent_blk, &parent)?;
        self.fat.flush(&mut self.disk)?;
        self.propagate_size(loc.parent_blk, -(loc.entry.size as i64))
    }

    /// Ajoute le contenu de `src` à la fin de `dst`. `src` est inchangé.
    /// Demande le droit d'écriture sur `dst`.
    pub fn append(&mut self, src: &str, dst: &str) -> Result<(), FsError> {
        let sloc = self.resolve(src)?;
        if sloc.entry.is_dir() {
            return Err(FsError::IsDirectory);
        }
        let dloc = self.resolve(dst)?;
        if dloc.entry.is_dir() {
            return Err(FsError::IsDirectory);
        }
        if !dloc.entry.rights.contains(AccessRights::WRITE) {
            return Err(FsError::PermissionDenied);
        }

        // Lire la source en entier d'abord : `append f f` reste correct.
        let payload = self.read_payload(sloc.entry.first_blk, sloc.entry.size as usize)?;
        if payload.is_empty() {
            return Ok(());
        }

        let chain = self.fat.chain(dloc.entry.first_blk)?;
        let tail = *chain.last().ok_or(FsError::Corrupted)?;
        let size2 = dloc.entry.size as usize;

        // Octets déjà occupés dans le bloc de queue. Une taille multiple de
        // BLOCK_SIZE (et non nulle) veut dire que la queue est pleine.
        let used = if size2 == 0 {
            0
        } else {
            match size2 % BLOCK_SIZE {
                0 => BLOCK_SIZE,
                u => u,
            }
        };
        let free_in_tail = BLOCK_SIZE - used;
        let needed = if payload.len() > free_in_tail {
            div_ceil(payload.len() - free_in_tail, BLOCK_SIZE)
        } else {
            0
        };
        let new_blocks = if needed > 0 {
            self.fat.find_multiple_empty(needed).ok_or(FsError::OutOfSpace)?
        } else {
            Vec::new()
        };

        // Compléter le bloc de queue, puis remplir les nouveaux blocs.
        let head_len = core::cmp::min(free_in_tail, payload.len());
        if head_len > 0 {
            let mut buf = [0u8; BLOCK_SIZE];
            self.disk.read_block(tail, &mut buf)?;
            buf[used..used + head_len].copy_from_slice(&payload[..head_len]);
            self.disk.write_block(tail, &buf)?;
        }
        self.write_blocks(&new_blocks, &payload[head_len..])?;

        if let Some(&first_new) = new_blocks.first() {
            self.fat.link_chain(&new_blocks);
            self.fat.extend(tail, first_new);
        }

        let delta = payload.len() as u32;
        let mut dparent = self.load_dir(dloc.parent_blk)?;
        let entry = dparent.get_mut(dloc.slot).ok_or(FsError::Corrupted)?;
        entry.size += delta;
        self.store_dir(dloc.parent_blk, &dparent)?;
        self.fat.flush(&mut self.disk)?;
        self.propagate_size(dloc.parent_blk, delta as i64)
    }

    /// Crée le répertoire `path` : un bloc alloué, slot 0 = `..` vers le
    /// parent, cellule FAT à `EOF`.
    pub fn mkdir(&mut self, path: &str) -> Result<(), FsError> {
        let (parent_blk, name) = self.resolve_parent(path)?;
        validate_name(&name)?;

        let mut parent = self.load_dir(parent_blk)?;
        if parent.find(&name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if parent.first_free_slot().is_none() {
            return Err(FsError::DirectoryFull);
        }

        let blk = self.fat.find_empty().ok_or(FsError::OutOfSpace)?;
        self.store_dir(blk, &DirBlock::new_subdir(parent_blk))?;
        self.fat.link_chain(&[blk]);

        parent.insert(DirEntry::new_dir(name, blk))?;
        self.store_dir(parent_blk, &parent)?;
        self.fat.flush(&mut self.disk)
    }

    /// Change le répertoire courant. `..` fait remonter d'un segment ;
    /// depuis la racine, `cd ..` ne bouge pas.
    pub fn cd(&mut self, path: &str) -> Result<(), FsError> {
        let loc = self.resolve(path)?;
        if !loc.entry.is_dir() {
            return Err(FsError::IsFile);
        }
        self.cwd = path::canonicalize(&self.cwd, path);
        Ok(())
    }

    /// Chemin absolu canonique du répertoire courant.
    pub fn pwd(&self) -> &str {
        &self.cwd
    }

    /// Remplace les droits d'accès de `path` par `mode`, la forme décimale
    /// d'un entier de 0 à 7. Toute autre valeur échoue.
    pub fn chmod(&mut self, mode: &str, path: &str) -> Result<(), FsError> {
        let bits: u8 = mode.parse().map_err(|_| FsError::InvalidArgument)?;
        if bits > 7 {
            return Err(FsError::InvalidArgument);
        }

        let loc = self.resolve(path)?;
        let mut parent = self.load_dir(loc.parent_blk)?;
        let entry = parent.get_mut(loc.slot).ok_or(FsError::Corrupted)?;
        entry.rights = AccessRights::from_bits_truncate(bits);
        self.store_dir(loc.parent_blk, &parent)
    }

    // ---------- résolution de chemins ----------

    /// Composants à résoudre depuis la racine : ceux du répertoire courant
    /// d'abord si le chemin est relatif.
    fn absolute_components<'a>(&'a self, p: &'a str) -> Vec<&'a str> {
        let mut comps = Vec::new();
        if !path::is_absolute(p) {
            comps.extend(path::split(&self.cwd));
        }
        comps.extend(path::split(p));
        comps
    }

    /// Descend les répertoires nommés par `comps` depuis la racine et rend
    /// le bloc du dernier. `..` passe par le slot 0 du bloc courant.
    fn walk_dirs(&self, comps: &[&str]) -> Result<u16, FsError> {
        let mut cur_blk = ROOT_BLOCK;
        for comp in comps {
            let dir = self.load_dir(cur_blk)?;
            let entry = if *comp == ".." {
                dir.backlink()?.clone()
            } else {
                dir.find(comp).map(|(_, e)| e.clone()).ok_or(FsError::NotFound)?
            };
            if !entry.is_dir() {
                return Err(FsError::NotFound);
            }
            cur_blk = entry.first_blk;
        }
        Ok(cur_blk)
    }

    /// Résout un chemin complet vers l'entrée qu'il nomme.
    /// Le chemin `/` rend l'entrée propre de la racine (bloc 0, slot 0).
    fn resolve(&self, p: &str) -> Result<Located, FsError> {
        let comps = self.absolute_components(p);
        match comps.split_last() {
            None => {
                let root = self.load_dir(ROOT_BLOCK)?;
                Ok(Located { entry: root.backlink()?.clone(), parent_blk: ROOT_BLOCK, slot: 0 })
            }
            Some((last, inner)) => {
                let cur_blk = self.walk_dirs(inner)?;
                let dir = self.load_dir(cur_blk)?;
                if *last == ".." {
                    Ok(Located { entry: dir.backlink()?.clone(), parent_blk: cur_blk, slot: 0 })
                } else {
                    let (slot, entry) = dir.find(last).ok_or(FsError::NotFound)?;
                    Ok(Located { entry: entry.clone(), parent_blk: cur_blk, slot })
                }
            }
        }
    }

    /// Résout le parent d'un chemin à créer : bloc du répertoire qui
    /// accueillera l'entrée, et nom final.
    fn resolve_parent(&self, p: &str) -> Result<(u16, String), FsError> {
        let comps = self.absolute_components(p);
        let (last, inner) = comps.split_last().ok_or(FsError::InvalidArgument)?;
        if *last == ".." {
            return Err(FsError::InvalidArgument);
        }
        let parent_blk = self.walk_dirs(inner)?;
        Ok((parent_blk, String::from(*last)))
    }

    // ---------- entrées / sorties de blocs ----------

    fn load_dir(&self, blk: u16) -> Result<DirBlock, FsError> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.disk.read_block(blk, &mut buf)?;
        Ok(DirBlock::from_bytes(&buf))
    }

    fn store_dir(&mut self, blk: u16, dir: &DirBlock) -> Result<(), FsError> {
        self.disk.write_block(blk, &dir.to_bytes())
    }

    /// Lit `size` octets en suivant la chaîne qui commence en `first_blk`.
    fn read_payload(&self, first_blk: u16, size: usize) -> Result<Vec<u8>, FsError> {
        let mut out = Vec::with_capacity(size);
        let mut remaining = size;

        for blk in self.fat.chain(first_blk)? {
            if remaining == 0 {
                break;
            }
            let mut buf = [0u8; BLOCK_SIZE];
            self.disk.read_block(blk, &mut buf)?;
            let take = core::cmp::min(remaining, BLOCK_SIZE);
            out.extend_from_slice(&buf[..take]);
            remaining -= take;
        }

        if remaining > 0 {
            // La chaîne est plus courte que la taille annoncée.
            return Err(FsError::Corrupted);
        }
        Ok(out)
    }

    /// Écrit `payload` en tranches de [`BLOCK_SIZE`] octets (la dernière
    /// complétée par des zéros) dans les blocs donnés, dans l'ordre.
    fn write_blocks(&mut self, blocks: &[u16], payload: &[u8]) -> Result<(), FsError> {
        for (i, &blk) in blocks.iter().enumerate() {
            let mut buf = [0u8; BLOCK_SIZE];
            let start = i * BLOCK_SIZE;
            if start < payload.len() {
                let end = core::cmp::min(start + BLOCK_SIZE, payload.len());
                buf[..end - start].copy_from_slice(&payload[start..end]);
            }
            self.disk.write_block(blk, &buf)?;
        }
        Ok(())
    }

    /// Alloue une chaîne, écrit `payload` dedans et insère l'entrée dans le
    /// répertoire `parent_blk`. Utilisé par `create` et `cp`.
    fn write_new_file(&mut self, parent_blk: u16, name: String, payload: &[u8]) -> Result<(), FsError> {
        let mut parent = self.load_dir(parent_blk)?;
        if parent.find(&name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if parent.first_free_slot().is_none() {
            return Err(FsError::DirectoryFull);
        }

        let count = core::cmp::max(1, div_ceil(payload.len(), BLOCK_SIZE));
        let blocks = self.fat.find_multiple_empty(count).ok_or(FsError::OutOfSpace)?;

        // Données d'abord, FAT et répertoire ensuite.
        self.write_blocks(&blocks, payload)?;
        self.fat.link_chain(&blocks);

        let size = payload.len() as u32;
        parent.insert(DirEntry::new_file(name, size, blocks[0]))?;
        self.store_dir(parent_blk, &parent)?;
        self.fat.flush(&mut self.disk)?;
        self.propagate_size(parent_blk, size as i64)
    }

    // ---------- déplacements ----------

    /// `mv` vers un chemin qui n'existe pas : renommage dans le répertoire
    /// d'origine, vers le dernier composant de `dst`.
    fn rename_in_place(&mut self, sloc: Located, dst: &str) -> Result<(), FsError> {
        let name = path::final_component(dst)?;
        validate_name(name)?;

        let mut parent = self.load_dir(sloc.parent_blk)?;
        if parent.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        parent.rename(sloc.slot, name)?;
        self.store_dir(sloc.parent_blk, &parent)
    }

    /// `mv` vers un répertoire : l'entrée y est déplacée en gardant son
    /// nom. Un fichier homonyme est supprimé d'abord, un répertoire
    /// homonyme arrête tout.
    fn move_into_dir(&mut self, sloc: Located, target_blk: u16) -> Result<(), FsError> {
        if target_blk == sloc.parent_blk {
            return Ok(()); // déjà dedans
        }
        self.check_no_cycle(&sloc.entry, target_blk)?;

        let mut target = self.load_dir(target_blk)?;
        if let Some((slot, existing)) = target.find(&sloc.entry.name) {
            if existing.is_dir() {
                return Err(FsError::IsDirectory);
            }
            let displaced = existing.clone();
            self.fat.free_chain(displaced.first_blk)?;
            target.remove(slot);
            self.store_dir(target_blk, &target)?;
            self.fat.flush(&mut self.disk)?;
            self.propagate_size(target_blk, -(displaced.size as i64))?;
        }

        // Vérifier la place avant de toucher au répertoire d'origine.
        let target = self.load_dir(target_blk)?;
        if target.first_free_slot().is_none() {
            return Err(FsError::DirectoryFull);
        }

        self.transfer(sloc, target_blk, None)
    }

    /// `mv` vers un fichier existant : celui-ci est supprimé et la source
    /// prend sa place (même répertoire, même nom).
    fn move_onto_file(&mut self, sloc: Located, dloc: Located) -> Result<(), FsError> {
        if dloc.parent_blk == sloc.parent_blk && dloc.slot == sloc.slot {
            return Ok(()); // mv f f
        }
        self.check_no_cycle(&sloc.entry, dloc.parent_blk)?;

        self.fat.free_chain(dloc.entry.first_blk)?;
        let mut dparent = self.load_dir(dloc.parent_blk)?;
        dparent.remove(dloc.slot);
        self.store_dir(dloc.parent_blk, &dparent)?;
        self.fat.flush(&mut self.disk)?;
        self.propagate_size(dloc.parent_blk, -(dloc.entry.size as i64))?;

        if dloc.parent_blk == sloc.parent_blk {
            // même répertoire : simple renommage du slot source
            let mut parent = self.load_dir(sloc.parent_blk)?;
            parent.rename(sloc.slot, &dloc.entry.name)?;
            self.store_dir(sloc.parent_blk, &parent)
        } else {
            self.transfer(sloc, dloc.parent_blk, Some(dloc.entry.name))
        }
    }

    /// Déplace l'entrée `sloc` vers le répertoire `target_blk`, sous un
    /// nouveau nom éventuel. Corrige les tailles des deux lignées
    /// d'ancêtres et recâble le slot 0 d'un répertoire déplacé.
    fn transfer(&mut self, sloc: Located, target_blk: u16, new_name: Option<String>) -> Result<(), FsError> {
        let mut moved = sloc.entry;
        if let Some(name) = new_name {
            moved.name = name;
        }

        let mut sparent = self.load_dir(sloc.parent_blk)?;
        sparent.remove(sloc.slot);
        self.store_dir(sloc.parent_blk, &sparent)?;
        self.propagate_size(sloc.parent_blk, -(moved.size as i64))?;

        let mut target = self.load_dir(target_blk)?;
        target.insert(moved.clone())?;
        self.store_dir(target_blk, &target)?;

        if moved.is_dir() {
            let mut dirblk = self.load_dir(moved.first_blk)?;
            dirblk.backlink_mut()?.first_blk = target_blk;
            self.store_dir(moved.first_blk, &dirblk)?;
        }
        self.propagate_size(target_blk, moved.size as i64)
    }

    /// Refuse de déplacer un répertoire dans lui-même ou un descendant :
    /// la remontée des `..` depuis la cible ne doit pas croiser la source.
    fn check_no_cycle(&self, entry: &DirEntry, mut target_blk: u16) -> Result<(), FsError> {
        if !entry.is_dir() {
            return Ok(());
        }
        let mut steps = 0;
        loop {
            if target_blk == entry.first_blk {
                return Err(FsError::InvalidArgument);
            }
            if target_blk == ROOT_BLOCK {
                return Ok(());
            }
            target_blk = self.load_dir(target_blk)?.backlink()?.first_blk;
            steps += 1;
            if steps > FAT_ENTRIES {
                return Err(FsError::Corrupted);
            }
        }
    }

    // ---------- tailles ----------

    /// Ajoute `delta` à la taille de chaque ancêtre, du répertoire
    /// `dir_blk` jusqu'à l'entrée propre de la racine. La taille d'un
    /// répertoire vit dans le bloc de son parent ; celle de la racine dans
    /// son propre slot 0.
    fn propagate_size(&mut self, mut dir_blk: u16, delta: i64) -> Result<(), FsError> {
        if delta == 0 {
            return Ok(());
        }

        let mut steps = 0;
        loop {
            if dir_blk == ROOT_BLOCK {
                let mut root = self.load_dir(ROOT_BLOCK)?;
                let own = root.backlink_mut()?;
                own.size = add_delta(own.size, delta);
                self.store_dir(ROOT_BLOCK, &root)?;
                return Ok(());
            }

            let parent_blk = self.load_dir(dir_blk)?.backlink()?.first_blk;
            let mut parent = self.load_dir(parent_blk)?;
            let slot = parent.find_by_block(dir_blk).ok_or(FsError::Corrupted)?;
            let entry = parent.get_mut(slot).ok_or(FsError::Corrupted)?;
            entry.size = add_delta(entry.size, delta);
            self.store_dir(parent_blk, &parent)?;

            dir_blk = parent_blk;
            steps += 1;
            if steps > FAT_ENTRIES {
                return Err(FsError::Corrupted);
            }
        }
    }
}

fn add_delta(size: u32, delta: i64) -> u32 {
    (size as i64 + delta).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryKind, MemDisk};
    use alloc::string::ToString;

    /// Petit volume formaté, prêt à l'emploi.
    fn fresh() -> FileSystem<MemDisk> {
        let mut fs = FileSystem::mount(MemDisk::new(64)).expect("mount");
        fs.format().expect("format");
        fs
    }

    #[test]
    fn create_puis_cat() {
        let mut fs = fresh();
        fs.create("/a", b"hello").unwrap();
        assert_eq!(fs.cat("/a").unwrap(), b"hello");

        let entries = fs.ls().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].rights, AccessRights::all());
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn create_refuse_un_chemin_existant() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();
        assert_eq!(fs.create("/a", b"y").unwrap_err(), FsError::AlreadyExists);
        // mkdir et create se partagent l'espace de noms
        assert_eq!(fs.mkdir("/a").unwrap_err(), FsError::AlreadyExists);
    }

    #[test]
    fn create_refuse_un_nom_trop_long() {
        let mut fs = fresh();
        assert!(fs.create(&"a".repeat(55), b"x").is_ok());
        assert_eq!(fs.create(&"b".repeat(56), b"x").unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn create_sans_parent_echoue() {
        let mut fs = fresh();
        assert_eq!(fs.create("/pas/la", b"x").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn fichier_vide_occupe_un_bloc() {
        let mut fs = fresh();
        let avant = fs.free_blocks();
        fs.create("/vide", b"").unwrap();
        assert_eq!(fs.free_blocks(), avant - 1);
        assert_eq!(fs.cat("/vide").unwrap(), b"");
    }

    #[test]
    fn un_bloc_pile_un_bloc_plus_un() {
        let mut fs = fresh();

        let avant = fs.free_blocks();
        fs.create("/pile", &[7u8; BLOCK_SIZE]).unwrap();
        assert_eq!(fs.free_blocks(), avant - 1);

        let avant = fs.free_blocks();
        fs.create("/deborde", &[7u8; BLOCK_SIZE + 1]).unwrap();
        assert_eq!(fs.free_blocks(), avant - 2);

        assert_eq!(fs.cat("/deborde").unwrap().len(), BLOCK_SIZE + 1);
    }

    #[test]
    fn contenu_multi_blocs_fidele() {
        let mut fs = fresh();
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        fs.create("/gros", &payload).unwrap();
        assert_eq!(fs.cat("/gros").unwrap(), payload);
    }

    #[test]
    fn mkdir_cd_pwd() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.cd("/d").unwrap();
        assert_eq!(fs.pwd(), "/d/");

        fs.create("f", b"x").unwrap();
        assert_eq!(fs.cat("f").unwrap(), b"x");
        assert_eq!(fs.cat("/d/f").unwrap(), b"x");

        fs.cd("..").unwrap();
        assert_eq!(fs.pwd(), "/");

        let entries = fs.ls().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "d");
        assert_eq!(entries[0].kind, EntryKind::Dir);
        assert_eq!(entries[0].size, 1);
    }

    #[test]
    fn cd_vers_un_fichier_echoue() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();
        assert_eq!(fs.cd("/a").unwrap_err(), FsError::IsFile);
        assert_eq!(fs.cd("/rien").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn cd_parent_a_la_racine_ne_bouge_pas() {
        let mut fs = fresh();
        fs.cd("..").unwrap();
        assert_eq!(fs.pwd(), "/");
    }

    #[test]
    fn cat_d_un_repertoire_echoue() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        assert_eq!(fs.cat("/d").unwrap_err(), FsError::IsDirectory);
    }

    #[test]
    fn cp_copie_les_octets_et_alloue() {
        let mut fs = fresh();
        let payload: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
        fs.create("/a", &payload).unwrap();

        let avant = fs.free_blocks();
        fs.cp("/a", "/b").unwrap();
        assert_eq!(fs.free_blocks(), avant - 2);

        assert_eq!(fs.cat("/b").unwrap(), payload);
        assert_eq!(fs.cat("/a").unwrap(), payload);
    }

    #[test]
    fn cp_vers_un_nom_pris_echoue() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();
        fs.create("/b", b"y").unwrap();
        fs.mkdir("/d").unwrap();

        assert_eq!(fs.cp("/a", "/b").unwrap_err(), FsError::AlreadyExists);
        assert_eq!(fs.cp("/a", "/d").unwrap_err(), FsError::AlreadyExists);
        assert_eq!(fs.cp("/d", "/e").unwrap_err(), FsError::IsDirectory);
        assert_eq!(fs.cp("/rien", "/e").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn rm_restaure_les_blocs_libres() {
        let mut fs = fresh();
        let libres = fs.free_blocks();

        fs.create("/a", &[1u8; 5000]).unwrap();
        assert_eq!(fs.free_blocks(), libres - 2);

        fs.rm("/a").unwrap();
        assert_eq!(fs.free_blocks(), libres);
        assert_eq!(fs.cat("/a").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn rm_d_un_repertoire_non_vide_echoue() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.create("/d/f", b"z").unwrap();

        assert_eq!(fs.rm("/d").unwrap_err(), FsError::IsDirectory);

        fs.rm("/d/f").unwrap();
        fs.rm("/d").unwrap();
        assert_eq!(fs.cd("/d").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn rm_de_la_racine_echoue() {
        let mut fs = fresh();
        assert_eq!(fs.rm("/").unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn append_concatene() {
        let mut fs = fresh();
        fs.create("/a", b"AB").unwrap();
        fs.create("/b", b"CD").unwrap();

        fs.append("/a", "/b").unwrap();
        assert_eq!(fs.cat("/b").unwrap(), b"CDAB");
        assert_eq!(fs.cat("/a").unwrap(), b"AB");
    }

    #[test]
    fn append_sur_une_queue_pleine_alloue_un_bloc() {
        let mut fs = fresh();
        fs.create("/plein", &[9u8; BLOCK_SIZE]).unwrap();
        fs.create("/un", b"!").unwrap();

        let avant = fs.free_blocks();
        fs.append("/un", "/plein").unwrap();
        assert_eq!(fs.free_blocks(), avant - 1);

        let contenu = fs.cat("/plein").unwrap();
        assert_eq!(contenu.len(), BLOCK_SIZE + 1);
        assert_eq!(contenu[BLOCK_SIZE], b'!');
    }

    #[test]
    fn append_remplit_la_queue_sans_allouer() {
        let mut fs = fresh();
        fs.create("/a", b"xx").unwrap();
        fs.create("/b", b"yy").unwrap();

        let avant = fs.free_blocks();
        fs.append("/a", "/b").unwrap();
        assert_eq!(fs.free_blocks(), avant);
        assert_eq!(fs.cat("/b").unwrap(), b"yyxx");
    }

    #[test]
    fn append_d_un_fichier_sur_lui_meme() {
        let mut fs = fresh();
        fs.create("/a", b"AB").unwrap();
        fs.append("/a", "/a").unwrap();
        assert_eq!(fs.cat("/a").unwrap(), b"ABAB");
    }

    #[test]
    fn chmod_et_droits() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();

        fs.chmod("4", "/a").unwrap();
        assert_eq!(fs.cat("/a").unwrap(), b"x");
        assert_eq!(fs.append("/a", "/a").unwrap_err(), FsError::PermissionDenied);

        fs.chmod("0", "/a").unwrap();
        assert_eq!(fs.cat("/a").unwrap_err(), FsError::PermissionDenied);

        assert_eq!(fs.chmod("8", "/a").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(fs.chmod("abc", "/a").unwrap_err(), FsError::InvalidArgument);
        assert_eq!(fs.chmod("-1", "/a").unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn ls_demande_l_execution_sur_le_courant() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();

        fs.chmod("6", "/").unwrap();
        assert_eq!(fs.ls().unwrap_err(), FsError::PermissionDenied);

        fs.chmod("7", "/").unwrap();
        assert_eq!(fs.ls().unwrap().len(), 1);
    }

    #[test]
    fn mv_renomme_sur_place() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();
        fs.mv("/a", "/b").unwrap();

        assert_eq!(fs.cat("/a").unwrap_err(), FsError::NotFound);
        assert_eq!(fs.cat("/b").unwrap(), b"x");
    }

    #[test]
    fn mv_dans_un_repertoire_garde_le_nom() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.create("/a", b"xyz").unwrap();

        fs.mv("/a", "/d").unwrap();
        assert_eq!(fs.cat("/d/a").unwrap(), b"xyz");
        assert_eq!(fs.cat("/a").unwrap_err(), FsError::NotFound);

        // la taille a suivi le déplacement
        let entries = fs.ls().unwrap();
        let d = entries.iter().find(|e| e.name == "d").unwrap();
        assert_eq!(d.size, 3);
    }

    #[test]
    fn mv_ecarte_un_fichier_homonyme() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.create("/a", b"nouveau").unwrap();
        fs.create("/d/a", b"ancien-contenu").unwrap();

        let libres = fs.free_blocks();
        fs.mv("/a", "/d").unwrap();
        // l'ancienne chaîne est libérée, la nouvelle a juste changé de parent
        assert_eq!(fs.free_blocks(), libres + 1);
        assert_eq!(fs.cat("/d/a").unwrap(), b"nouveau");
    }

    #[test]
    fn mv_homonyme_repertoire_fatal() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.mkdir("/d/a").unwrap();
        fs.create("/a", b"x").unwrap();

        assert_eq!(fs.mv("/a", "/d").unwrap_err(), FsError::IsDirectory);
        // rien n'a bougé
        assert_eq!(fs.cat("/a").unwrap(), b"x");
    }

    #[test]
    fn mv_ecrase_un_fichier() {
        let mut fs = fresh();
        fs.create("/a", b"gagnant").unwrap();
        fs.create("/b", b"perdant").unwrap();

        fs.mv("/a", "/b").unwrap();
        assert_eq!(fs.cat("/b").unwrap(), b"gagnant");
        assert_eq!(fs.cat("/a").unwrap_err(), FsError::NotFound);
    }

    #[test]
    fn mv_d_un_repertoire_met_a_jour_le_retour() {
        let mut fs = fresh();
        fs.mkdir("/d1").unwrap();
        fs.mkdir("/d2").unwrap();
        fs.create("/d2/f", b"abc").unwrap();

        fs.mv("/d2", "/d1").unwrap();
        assert_eq!(fs.cat("/d1/d2/f").unwrap(), b"abc");

        // `..` remonte bien vers d1 maintenant
        fs.cd("/d1/d2").unwrap();
        fs.cd("..").unwrap();
        assert_eq!(fs.pwd(), "/d1/");

        // les tailles ont suivi
        fs.cd("/").unwrap();
        let entries = fs.ls().unwrap();
        let d1 = entries.iter().find(|e| e.name == "d1").unwrap();
        assert_eq!(d1.size, 3);
    }

    #[test]
    fn mv_d_un_repertoire_dans_son_descendant_echoue() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.mkdir("/d/sous").unwrap();

        assert_eq!(fs.mv("/d", "/d/sous").unwrap_err(), FsError::InvalidArgument);
    }

    #[test]
    fn mv_sur_lui_meme_ne_fait_rien() {
        let mut fs = fresh();
        fs.create("/a", b"x").unwrap();
        fs.mv("/a", "/a").unwrap();
        assert_eq!(fs.cat("/a").unwrap(), b"x");
    }

    #[test]
    fn tailles_propagees_jusqu_a_la_racine() {
        let mut fs = fresh();
        fs.mkdir("/d1").unwrap();
        fs.mkdir("/d1/d2").unwrap();
        fs.create("/d1/d2/f", b"xyz").unwrap();

        let root = fs.resolve("/").unwrap();
        assert_eq!(root.entry.size, 3);

        let d1 = fs.resolve("/d1").unwrap();
        let d2 = fs.resolve("/d1/d2").unwrap();
        assert_eq!(d1.entry.size, 3);
        assert_eq!(d2.entry.size, 3);

        fs.rm("/d1/d2/f").unwrap();
        assert_eq!(fs.resolve("/").unwrap().entry.size, 0);
        assert_eq!(fs.resolve("/d1").unwrap().entry.size, 0);
    }

    #[test]
    fn resolution_relative_et_chemins_tordus() {
        let mut fs = fresh();
        fs.mkdir("/d").unwrap();
        fs.create("/d/f", b"v").unwrap();

        assert_eq!(fs.cat("//d///f/").unwrap(), b"v");
        assert_eq!(fs.cat("/d/../d/f").unwrap(), b"v");

        fs.cd("/d").unwrap();
        assert_eq!(fs.cat("../d/f").unwrap(), b"v");
        assert_eq!(fs.cat("./f").unwrap(), b"v");
    }

    #[test]
    fn espace_epuise() {
        // 8 blocs : 0 et 1 réservés, 6 de données.
        let mut fs = FileSystem::mount(MemDisk::new(8)).unwrap();
        fs.format().unwrap();

        fs.create("/a", &[0u8; 4 * BLOCK_SIZE]).unwrap();
        assert_eq!(fs.free_blocks(), 2);
        assert_eq!(
            fs.create("/b", &[0u8; 3 * BLOCK_SIZE]).unwrap_err(),
            FsError::OutOfSpace
        );
        // échec sans allocation partielle
        assert_eq!(fs.free_blocks(), 2);
    }

    #[test]
    fn repertoire_plein() {
        let mut fs = FileSystem::mount(MemDisk::new(128)).unwrap();
        fs.format().unwrap();

        for i in 0..63 {
            fs.create(&alloc::format!("/f{i}"), b"").unwrap();
        }
        assert_eq!(fs.create("/deborde", b"").unwrap_err(), FsError::DirectoryFull);
    }

    #[test]
    fn remontage_apres_sauvegarde() {
        let mut fs = fresh();
        fs.create("/a", b"persistant").unwrap();
        fs.mkdir("/d").unwrap();

        let disk = fs.into_device();
        let fs = FileSystem::mount(disk).unwrap();

        assert_eq!(fs.cat("/a").unwrap(), b"persistant");
        assert_eq!(fs.pwd(), "/");
        let noms: Vec<_> = fs.ls().unwrap().iter().map(|e| e.name.clone()).collect();
        assert_eq!(noms, vec!["a".to_string(), "d".to_string()]);
    }

    #[test]
    fn format_repart_de_zero() {
        let mut fs = fresh();
        let libres = fs.free_blocks();
        fs.create("/a", b"x").unwrap();
        fs.mkdir("/d").unwrap();
        fs.cd("/d").unwrap();

        fs.format().unwrap();
        assert_eq!(fs.pwd(), "/");
        assert_eq!(fs.free_blocks(), libres);
        assert!(fs.ls().unwrap().is_empty());
    }
}
