use std::path::Path;

use crate::{CompileError, Compiler, CompilerConfig, OutputStyle, Source, DEFAULT_PRECISION};

const GRASS_VERSION: &str = "0.13";

/// Compiles Sass/SCSS with [grass](https://github.com/connorskees/grass).
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassCompiler;

impl GrassCompiler {
    /// Create the compiler, warning about options grass cannot honour.
    pub fn new(config: &CompilerConfig) -> Self {
        if config.line_comments {
            tracing::warn!("grass does not emit line number comments; ignoring --line-numbers");
        }
        if config.source_map {
            tracing::warn!("grass does not emit source maps; ignoring --source-map");
        }
        if config.precision != DEFAULT_PRECISION {
            tracing::warn!(
                precision = config.precision,
                "grass uses a fixed numeric precision; ignoring --precision"
            );
        }
        if matches!(config.style, OutputStyle::Nested | OutputStyle::Compact) {
            tracing::debug!(style = %config.style, "grass renders this style as expanded");
        }
        Self
    }
}

fn options<'a>(config: &CompilerConfig, local: &[&Path]) -> grass::Options<'a> {
    let style = match config.style {
        OutputStyle::Compressed => grass::OutputStyle::Compressed,
        OutputStyle::Nested | OutputStyle::Expanded | OutputStyle::Compact => {
            grass::OutputStyle::Expanded
        }
    };
    grass::Options::default()
        .style(style)
        .load_paths(local)
        .load_paths(config.import_paths.as_slice())
}

impl Compiler for GrassCompiler {
    fn compile(&self, source: &Source, config: &CompilerConfig) -> Result<String, CompileError> {
        let compiled = match source {
            Source::Path(path) => {
                let local: Vec<&Path> = path.parent().into_iter().collect();
                grass::from_path(path, &options(config, &local))
            }
            Source::Text {
                contents,
                load_paths,
            } => {
                let local: Vec<&Path> = load_paths.iter().map(|p| p.as_path()).collect();
                grass::from_string(contents.as_str(), &options(config, &local))
            }
        };
        compiled.map_err(|e| CompileError::from_message(e.to_string()))
    }

    fn version(&self) -> String {
        format!("grass {GRASS_VERSION}")
    }
}
