use std::{
    fs, io,
    path::{Path, PathBuf},
};

mod compiler;
pub use compiler::{CompileError, Compiler, Source};

mod config;
pub use config::{
    parse_import_paths, CompilerConfig, IllegalStyle, OutputStyle, DEFAULT_PRECISION,
};

mod dispatch;
pub use dispatch::{CompileRequest, Destination, Dispatcher};

mod partial;
pub use partial::{change_suffix, is_partial, is_sass_source, resolve_dependents};

#[cfg(feature = "sass")]
mod sass;
#[cfg(feature = "sass")]
pub use sass::GrassCompiler;

#[cfg(feature = "watch")]
mod watch;
#[cfg(feature = "watch")]
pub use watch::{
    watch, ChangeEvent, ChangeKind, CompileJob, WatchController, WatchError, WatchTarget,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] io::Error),
    #[error("{0}")]
    GlobPatternError(#[from] glob::PatternError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, io::Error),
    #[error("failed to write to output file {0}: {1}")]
    Write(PathBuf, io::Error),
    #[error("failed to read directory {0}: {1}")]
    ReadDir(PathBuf, io::Error),
    #[error("no non-partial sass file in this directory: {0}")]
    NoNonPartial(PathBuf),
    #[error("{0}")]
    Compile(#[from] CompileError),
}

impl Error {
    /// Process exit status for a failed compile.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Compile(CompileError::Internal) => 2,
            _ => 1,
        }
    }
}

/// Write `contents` to `to`, replacing whatever was there.
/// The parent directory must already exist.
pub fn write(contents: impl AsRef<str>, to: impl AsRef<Path>) -> Result<(), Error> {
    let to = to.as_ref();
    fs::write(to, contents.as_ref()).map_err(|e| Error::Write(to.to_path_buf(), e))
}

/// Read a source file into memory.
pub fn read(from: impl AsRef<Path>) -> Result<String, Error> {
    let from = from.as_ref();
    fs::read_to_string(from).map_err(|e| Error::Read(from.to_path_buf(), e))
}
