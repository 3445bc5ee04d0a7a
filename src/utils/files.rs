use std::{
    fs::{self, File},
    io::Read,
    path::Path,
};

use uuid::Uuid;

pub fn file_exists(file_name: impl AsRef<Path>) -> bool {
    file_name.as_ref().is_file()
}

pub fn read_file(file_name: impl AsRef<Path>) -> std::io::Result<String> {
    let mut file = File::open(file_name)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

pub fn create_directories_if_needed(file_name: impl AsRef<Path>) -> std::io::Result<()> {
    if let Some(parent) = file_name.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/* Every regular file under `folder`, recursively, in a deterministic order */
pub fn list_files_recursive(folder: impl AsRef<Path>) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(folder)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            files.extend(list_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
