//! Petite CLI pour manipuler une image minifs.
//!
//! Cette CLI s'appuie sur la bibliothèque `minifs`:
//! - mode non interactif via options (`--format`, `--ls`, `--cat`, `--create`)
//! - mode shell interactif avec les douze commandes du système de fichiers
//!
//! L'image est chargée en mémoire au démarrage ; chaque commande qui modifie
//! le volume réécrit le fichier image, ce qui rend le résultat persistant.
//!
//! Exemple rapide:
//! ```
//! minifs_cli --file disk.img --format
//! minifs_cli --file disk.img --create /notes.txt   (contenu lu sur stdin)
//! minifs_cli --file disk.img --cat /notes.txt
//! ```
//!
//! Codes de retour du mode non interactif : 0 si tout va bien, 1 pour un
//! chemin introuvable ou une entrée invalide, -1 pour une erreur fatale.

use minifs::{DirEntry, FileSystem, FsError, MemDisk};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::exit;

/// Taille par défaut d'une image neuve : 2048 blocs, soit 8 Mio.
const DEFAULT_BLOCKS: u16 = 2048;

/// Affiche l'usage de la CLI avec les commandes disponibles.
fn print_usage() {
    eprintln!(
        "Usage:
  minifs_cli --file <disk.img> [--format] [--ls] [--cat <path>] [--create <path>]

Exemples:
  minifs_cli --file disk.img --format
  minifs_cli --file disk.img --ls
  minifs_cli --file disk.img --cat /notes.txt
  minifs_cli --file disk.img --create /notes.txt

Mode shell:
  minifs_cli --file disk.img
  (puis: format, create, cat, ls, cp, mv, rm, append, mkdir, cd, pwd, chmod)"
    );
}

/// Affiche l'aide du mode shell interactif.
fn print_shell_help() {
    println!(
        "Commandes:
  format               - réinitialiser le volume
  create <path>        - créer un fichier (contenu lu jusqu'à une ligne vide)
  cat <path>           - lire un fichier
  ls                   - lister le répertoire courant
  cp <src> <dst>       - copier un fichier
  mv <src> <dst>       - déplacer ou renommer
  rm <path>            - supprimer un fichier ou un répertoire vide
  append <src> <dst>   - ajouter src à la fin de dst
  mkdir <path>         - créer un répertoire
  cd <path>            - changer de répertoire courant
  pwd                  - afficher le répertoire courant
  chmod <0-7> <path>   - changer les droits d'accès
  help                 - cette aide
  exit                 - quitter"
    );
}

/// Point d'entrée : parse les arguments, charge l'image en mémoire, puis
/// exécute la commande demandée ou bascule en mode shell interactif.
fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);

    let mut image_path: Option<String> = None;
    let mut command: Option<String> = None;
    let mut target: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--file" | "-f" => image_path = args.next(),
            "--format" => command = Some("format".to_string()),
            "--ls" => command = Some("ls".to_string()),
            "--cat" => {
                command = Some("cat".to_string());
                target = args.next();
            }
            "--create" => {
                command = Some("create".to_string());
                target = args.next();
            }
            _ => {
                eprintln!("Argument inconnu : {arg}");
                print_usage();
                exit(1);
            }
        }
    }

    let image_path = match image_path {
        Some(p) => p,
        None => {
            print_usage();
            exit(1);
        }
    };

    // Charge l'image existante, ou repart d'un volume vierge pour --format.
    let disk = match fs::read(&image_path) {
        Ok(bytes) => match MemDisk::from_bytes(bytes) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Image invalide {image_path}: {e}");
                exit(-1);
            }
        },
        Err(_) if command.as_deref() == Some("format") => MemDisk::new(DEFAULT_BLOCKS),
        Err(e) => {
            eprintln!("Impossible de lire {image_path}: {e}");
            exit(-1);
        }
    };

    let mut fs = match FileSystem::mount(disk) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("Montage impossible : {e}");
            exit(-1);
        }
    };

    match command.as_deref() {
        Some("format") => {
            if let Err(e) = fs.format() {
                eprintln!("Erreur format: {e}");
                exit(exit_code(e));
            }
            if let Err(code) = save_image(&image_path, &fs) {
                exit(code);
            }
        }
        Some("ls") => match fs.ls() {
            Ok(entries) => print_entries(&entries),
            Err(e) => {
                eprintln!("Erreur ls: {e}");
                exit(exit_code(e));
            }
        },
        Some("cat") => {
            let path = match target {
                Some(p) => p,
                None => {
                    eprintln!("--cat nécessite un chemin");
                    exit(1);
                }
            };
            match fs.cat(&path) {
                Ok(bytes) => print!("{}", String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    eprintln!("Erreur cat {path}: {e}");
                    exit(exit_code(e));
                }
            }
        }
        Some("create") => {
            let path = match target {
                Some(p) => p,
                None => {
                    eprintln!("--create nécessite un chemin");
                    exit(1);
                }
            };
            let payload = read_payload();
            if let Err(e) = fs.create(&path, &payload) {
                eprintln!("Erreur create {path}: {e}");
                exit(exit_code(e));
            }
            if let Err(code) = save_image(&image_path, &fs) {
                exit(code);
            }
        }
        Some(other) => {
            eprintln!("Commande inconnue : {other}");
            print_usage();
            exit(1);
        }
        None => run_shell(&image_path, &mut fs),
    }
}

/// Lit le contenu d'un nouveau fichier sur l'entrée standard : des lignes
/// jusqu'à une ligne vide (non comprise).
fn read_payload() -> Vec<u8> {
    let stdin = io::stdin();
    let mut lines: Vec<String> = Vec::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.is_empty() {
            break;
        }
        lines.push(line);
    }

    payload_from_lines(lines)
}

/// Assemble les lignes saisies en un contenu de fichier. Pas de saut de
/// ligne final : un fichier d'une ligne `hello` fait 5 octets.
fn payload_from_lines(lines: Vec<String>) -> Vec<u8> {
    lines.join("\n").into_bytes()
}

/// Réécrit le fichier image avec l'état courant du volume.
fn save_image(path: &str, fs: &FileSystem<MemDisk>) -> Result<(), i32> {
    if let Err(e) = fs::write(path, fs.device().as_bytes()) {
        eprintln!("Impossible d'écrire {path}: {e}");
        return Err(-1);
    }
    Ok(())
}

/// Une ligne par entrée : nom, type (0 fichier / 1 répertoire),
/// droits `rwx` et taille en octets.
fn print_entries(entries: &[DirEntry]) {
    for e in entries {
        println!("{:<24} {} {} {:>8}", e.name, e.kind as u8, e.rights, e.size);
    }
}

/// Code de retour du mode non interactif pour une erreur donnée.
fn exit_code(e: FsError) -> i32 {
    match e {
        FsError::NotFound | FsError::InvalidArgument => 1,
        _ => -1,
    }
}

/// Lance le shell interactif : les douze commandes du système de fichiers,
/// avec sauvegarde de l'image après chaque commande qui modifie le volume.
fn run_shell(image_path: &str, fs: &mut FileSystem<MemDisk>) {
    println!("minifs shell. Tapez 'help' pour l'aide, 'exit' pour quitter.");

    let stdin = io::stdin();

    loop {
        print!("minifs:{}> ", fs.pwd());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        let n = match stdin.read_line(&mut line) {
            Ok(n) => n,
            Err(_) => break,
        };
        if n == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap();
        let arg_a = parts.next();
        let arg_b = parts.next();

        let result = match cmd {
            "exit" | "quit" => break,
            "help" => {
                print_shell_help();
                continue;
            }
            "pwd" => {
                println!("{}", fs.pwd());
                continue;
            }
            "ls" => match fs.ls() {
                Ok(entries) => {
                    print_entries(&entries);
                    continue;
                }
                Err(e) => Err(e),
            },
            "cat" => match arg_a {
                Some(p) => match fs.cat(p) {
                    Ok(bytes) => {
                        print!("{}", String::from_utf8_lossy(&bytes));
                        continue;
                    }
                    Err(e) => Err(e),
                },
                None => {
                    println!("Usage: cat <path>");
                    continue;
                }
            },
            "cd" => match arg_a {
                Some(p) => match fs.cd(p) {
                    Ok(()) => continue,
                    Err(e) => Err(e),
                },
                None => match fs.cd("/") {
                    Ok(()) => continue,
                    Err(e) => Err(e),
                },
            },
            "format" => fs.format(),
            "create" => match arg_a {
                Some(p) => {
                    let payload = read_payload();
                    fs.create(p, &payload)
                }
                None => {
                    println!("Usage: create <path>");
                    continue;
                }
            },
            "mkdir" => match arg_a {
                Some(p) => fs.mkdir(p),
                None => {
                    println!("Usage: mkdir <path>");
                    continue;
                }
            },
            "rm" => match arg_a {
                Some(p) => fs.rm(p),
                None => {
                    println!("Usage: rm <path>");
                    continue;
                }
            },
            "cp" => match (arg_a, arg_b) {
                (Some(src), Some(dst)) => fs.cp(src, dst),
                _ => {
                    println!("Usage: cp <src> <dst>");
                    continue;
                }
            },
            "mv" => match (arg_a, arg_b) {
                (Some(src), Some(dst)) => fs.mv(src, dst),
                _ => {
                    println!("Usage: mv <src> <dst>");
                    continue;
                }
            },
            "append" => match (arg_a, arg_b) {
                (Some(src), Some(dst)) => fs.append(src, dst),
                _ => {
                    println!("Usage: append <src> <dst>");
                    continue;
                }
            },
            "chmod" => match (arg_a, arg_b) {
                (Some(mode), Some(p)) => fs.chmod(mode, p),
                _ => {
                    println!("Usage: chmod <0-7> <path>");
                    continue;
                }
            },
            _ => {
                println!("Commande inconnue: {cmd}. Tapez 'help'.");
                continue;
            }
        };

        match result {
            Ok(()) => {
                // seules les commandes qui modifient le volume arrivent ici
                if save_image(image_path, fs).is_err() {
                    break;
                }
            }
            Err(e) => println!("Erreur {cmd}: {e}"),
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn contenu_sans_saut_de_ligne_final() {
        let payload = payload_from_lines(vec!["hello".to_string()]);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn lignes_multiples_jointes() {
        let payload = payload_from_lines(vec!["un".to_string(), "deux".to_string()]);
        assert_eq!(payload, b"un\ndeux");
    }

    #[test]
    fn aucune_ligne_fichier_vide() {
        assert_eq!(payload_from_lines(Vec::new()), b"");
    }

    #[test]
    fn codes_de_retour() {
        assert_eq!(exit_code(FsError::NotFound), 1);
        assert_eq!(exit_code(FsError::InvalidArgument), 1);
        assert_eq!(exit_code(FsError::OutOfSpace), -1);
        assert_eq!(exit_code(FsError::Io), -1);
    }
}
