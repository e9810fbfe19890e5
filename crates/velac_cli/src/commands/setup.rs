//! The `install`/`uninstall` subcommands: materializing the bundled standard
//! library under the user's home directory.

use std::error::Error;
use std::fmt::Display;
use std::io::Write;

use include_dir::{include_dir, Dir, File};
use log::{debug, trace};

static LIBRARY_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets/std");

#[derive(Debug, Clone)]
enum SetupError {
    DirectoryError(String),
    FileError(String),
}

impl Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let err = match self {
            SetupError::DirectoryError(err) => err.to_owned(),
            SetupError::FileError(err) => err.to_owned(),
        };
        f.write_str(&err)
    }
}

impl Error for SetupError {}

fn library_root() -> String {
    format!("{}/.velac/lib", home::home_dir().unwrap_or_else(|| ".".into()).to_string_lossy())
}

pub fn install() -> Result<(), Box<dyn Error>> {
    debug!("starting install of bundled standard library");
    let root = library_root();

    if std::fs::remove_dir_all(&root).is_err() {
        trace!("directory '{root}' did not exist");
    }
    create_directory(&root, &LIBRARY_DIR)?;

    debug!("finished install of bundled standard library");
    Ok(())
}

pub fn uninstall() -> Result<(), Box<dyn Error>> {
    let root = library_root();
    std::fs::remove_dir_all(&root).map_err(|e| format!("failed to remove '{root}': {e}"))?;
    println!("[UNINSTALL] Removed '{root}'");
    Ok(())
}

fn create_directory(parent: &str, directory: &Dir) -> Result<(), SetupError> {
    let path = format!("{parent}/{}", directory.path().to_string_lossy());
    println!("[INSTALL] Creating '{path}'");

    if std::fs::create_dir_all(&path).is_err() {
        return Err(SetupError::DirectoryError(format!("Failed to create directory '{path}'")));
    }

    for entry in directory.entries() {
        match entry {
            include_dir::DirEntry::Dir(dir) => create_directory(parent, dir)?,
            include_dir::DirEntry::File(file) => create_file(parent, file)?,
        }
    }

    Ok(())
}

fn create_file(base: &str, file: &File) -> Result<(), SetupError> {
    let path = format!("{base}/{}", file.path().to_string_lossy());
    debug!("creating file '{path}'");

    let Ok(mut file_to_write) = std::fs::File::create(&path) else {
        return Err(SetupError::FileError(format!("Failed to create file '{path}'")));
    };

    if file_to_write.write_all(file.contents()).is_err() {
        return Err(SetupError::FileError(format!("Failed to write contents of file '{path}'")));
    }
    Ok(())
}
