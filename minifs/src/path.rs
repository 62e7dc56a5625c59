//! Découpage et canonicalisation des chemins.
//!
//! Les chemins sont séparés par des `/`. Un chemin qui commence par `/` est
//! absolu, sinon il est interprété depuis le répertoire courant. Les
//! composants vides (produits par `//` ou un `/` final) et `.` sont ignorés ;
//! `..` désigne le parent. La comparaison des noms est octet à octet, sans
//! repli de casse.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use crate::FsError;

/// Découpe un chemin en composants, sans les vides ni les `.`.
/// Les `..` sont conservés : c'est le résolveur qui les suit via le
/// slot 0 des blocs de répertoire.
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty() && *part != ".").collect()
}

/// Indique si le chemin est absolu.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Forme canonique absolue d'un chemin résolu depuis `cwd`.
///
/// La forme retournée commence et finit par `/` (la racine est le seul
/// caractère `/`). Les `..` font remonter d'un segment, sans jamais passer
/// au-dessus de la racine.
///
/// Exemples :
/// - cwd="/d/", path=".."         -> "/"
/// - cwd="/d/", path="sub"        -> "/d/sub/"
/// - cwd="/d/", path="/autre/xx"  -> "/autre/xx/"
pub fn canonicalize(cwd: &str, path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();

    if !is_absolute(path) {
        for part in cwd.split('/') {
            push_component(&mut components, part);
        }
    }
    for part in path.split('/') {
        push_component(&mut components, part);
    }

    if components.is_empty() {
        String::from("/")
    } else {
        let mut result = String::from("/");
        result.push_str(&components.join("/"));
        result.push('/');
        result
    }
}

/// Ajoute un composant en gérant `.` et `..`.
fn push_component<'a>(components: &mut Vec<&'a str>, part: &'a str) {
    match part {
        "" | "." => {}
        ".." => {
            components.pop();
        }
        _ => components.push(part),
    }
}

/// Dernier composant d'un chemin, pour les opérations qui ont besoin d'un
/// nom de destination (`mv` vers un chemin qui n'existe pas encore).
///
/// Échoue sur un chemin vide ou qui ne se termine pas par un vrai nom.
pub fn final_component(path: &str) -> Result<&str, FsError> {
    match split(path).last() {
        Some(&name) if name != ".." => Ok(name),
        _ => Err(FsError::InvalidArgument),
    }
}
