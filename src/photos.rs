//! Anexo de fotos a um levantamento
//!
//! Aceita arquivos soltos ou pastas; pastas são varridas em
//! profundidade e só entram imagens. O arquivo físico fica onde está,
//! o registro guarda só a referência.

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use levantamento_common::PhotoRef;

use crate::error::{LevantamentoError, Result};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Monta as referências de foto na ordem do anexo: argumentos na ordem
/// dada, pastas expandidas com o conteúdo ordenado por nome de arquivo.
/// Os nomes de exportação saem como `foto_01.jpg`, `foto_02.png`...
pub fn attach_photos(paths: &[PathBuf]) -> Result<Vec<PhotoRef>> {
    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(LevantamentoError::FileNotFound(path.display().to_string()));
        }
        if path.is_dir() {
            files.extend(scan_folder(path));
        } else if let Some(ext) = image_extension(path) {
            files.push((path.clone(), ext));
        } else {
            warn!("anexo ignorado, não é imagem: {}", path.display());
        }
    }

    let refs = files
        .into_iter()
        .enumerate()
        .map(|(i, (path, ext))| PhotoRef {
            export_name: format!("foto_{:02}.{ext}", i + 1),
            original_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            physical_path: path,
        })
        .collect();
    Ok(refs)
}

fn scan_folder(folder: &Path) -> Vec<(PathBuf, String)> {
    let mut images: Vec<(PathBuf, String)> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let path = e.into_path();
            image_extension(&path).map(|ext| (path, ext))
        })
        .collect();

    images.sort_by_key(|(path, _)| path.file_name().map(|n| n.to_os_string()));
    images
}

/// Extensão normalizada quando o arquivo é uma imagem reconhecida.
fn image_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"img").expect("falha ao criar arquivo");
    }

    #[test]
    fn test_folder_is_walked_recursively_and_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(&dir.path().join("b.jpg"));
        touch(&dir.path().join("a.PNG"));
        touch(&dir.path().join("notas.txt"));
        fs::create_dir(dir.path().join("sub")).expect("criar subpasta");
        touch(&dir.path().join("sub").join("c.jpeg"));

        let refs = attach_photos(&[dir.path().to_path_buf()]).expect("anexar");

        let names: Vec<&str> = refs.iter().map(|r| r.export_name.as_str()).collect();
        assert_eq!(names, vec!["foto_01.png", "foto_02.jpg", "foto_03.jpeg"]);
        assert_eq!(refs[0].original_name, "a.PNG");
        assert_eq!(refs[2].original_name, "c.jpeg");
    }

    #[test]
    fn test_explicit_files_keep_argument_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let z = dir.path().join("z.jpg");
        let a = dir.path().join("a.jpg");
        touch(&z);
        touch(&a);

        let refs = attach_photos(&[z, a]).expect("anexar");

        assert_eq!(refs[0].original_name, "z.jpg");
        assert_eq!(refs[0].export_name, "foto_01.jpg");
        assert_eq!(refs[1].original_name, "a.jpg");
        assert_eq!(refs[1].export_name, "foto_02.jpg");
    }

    #[test]
    fn test_numbering_continues_across_arguments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let solo = dir.path().join("solo.webp");
        touch(&solo);
        let pasta = dir.path().join("pasta");
        fs::create_dir(&pasta).expect("criar pasta");
        touch(&pasta.join("x.gif"));

        let refs = attach_photos(&[solo, pasta]).expect("anexar");

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].export_name, "foto_01.webp");
        assert_eq!(refs[1].export_name, "foto_02.gif");
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(matches!(
            attach_photos(&[PathBuf::from("/nao/existe.jpg")]),
            Err(LevantamentoError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_non_image_file_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let txt = dir.path().join("notas.txt");
        touch(&txt);

        let refs = attach_photos(&[txt]).expect("anexar");
        assert!(refs.is_empty());
    }
}
