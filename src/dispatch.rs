use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{write, Compiler, CompilerConfig, Error, Source};

/// Where compiled CSS goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    File(PathBuf),
    Stdout,
}

impl From<Option<&Path>> for Destination {
    fn from(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Destination::File(path.to_path_buf()),
            None => Destination::Stdout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub source: Source,
    pub destination: Destination,
}

/// Runs single compile requests against a [`Compiler`] with a fixed configuration.
pub struct Dispatcher<'a, C> {
    compiler: C,
    config: &'a CompilerConfig,
}

impl<'a, C: Compiler> Dispatcher<'a, C> {
    pub fn new(compiler: C, config: &'a CompilerConfig) -> Self {
        Self { compiler, config }
    }

    /// Compile `input` and write the result to `output`, or to stdout when
    /// there is no output path.
    pub fn compile_file(&self, input: &Path, output: Option<&Path>) -> Result<(), Error> {
        self.dispatch(CompileRequest {
            source: Source::Path(input.to_path_buf()),
            destination: output.into(),
        })
    }

    /// Compile the request's source and deliver the CSS.
    ///
    /// # Errors
    ///
    /// Returns the compiler's diagnostic if compilation fails, or the
    /// underlying I/O error if the output cannot be written.
    pub fn dispatch(&self, request: CompileRequest) -> Result<(), Error> {
        if let Source::Path(path) = &request.source {
            tracing::info!("Compiling file: {}", path.display());
        }
        let css = self.compiler.compile(&request.source, self.config)?;

        match request.destination {
            Destination::File(path) => {
                tracing::info!("Writing to file: {}", path.display());
                write(css, &path)
            }
            Destination::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{css}")?;
                stdout.flush()?;
                Ok(())
            }
        }
    }
}
