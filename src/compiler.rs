use std::path::PathBuf;

use crate::CompilerConfig;

/// What to hand to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file on disk. Imports resolve relative to its directory.
    Path(PathBuf),
    /// In-memory source, read from stdin or stitched together from several
    /// files. `load_paths` lists the directories those files came from.
    Text {
        contents: String,
        load_paths: Vec<PathBuf>,
    },
}

impl Source {
    pub fn text(contents: impl Into<String>) -> Self {
        Source::Text {
            contents: contents.into(),
            load_paths: Vec::new(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("{message}")]
    Sass { message: String },
    #[error("An error occurred; no error message available")]
    NoMessage,
    /// The library reported neither output nor an error.
    #[error("Unknown internal error.")]
    Internal,
}

impl CompileError {
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            CompileError::NoMessage
        } else {
            CompileError::Sass { message }
        }
    }
}

/// A Sass to CSS compiler library.
pub trait Compiler {
    fn compile(&self, source: &Source, config: &CompilerConfig) -> Result<String, CompileError>;

    /// Name and version of the underlying library.
    fn version(&self) -> String;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, source: &Source, config: &CompilerConfig) -> Result<String, CompileError> {
        (**self).compile(source, config)
    }

    fn version(&self) -> String {
        (**self).version()
    }
}
