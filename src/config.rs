use std::{fmt, path::PathBuf, str::FromStr};

/// Decimal places kept in numeric output unless `--precision` says otherwise.
pub const DEFAULT_PRECISION: u32 = 4;

/// How the produced CSS is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    #[default]
    Nested,
    Expanded,
    Compact,
    Compressed,
}

impl OutputStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputStyle::Nested => "nested",
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compact => "compact",
            OutputStyle::Compressed => "compressed",
        }
    }
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Illegal output style: {0}")]
pub struct IllegalStyle(pub String);

impl FromStr for OutputStyle {
    type Err = IllegalStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nested" => Ok(OutputStyle::Nested),
            "expanded" => Ok(OutputStyle::Expanded),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            other => Err(IllegalStyle(other.to_string())),
        }
    }
}

/// Options handed to the compiler on every invocation.
///
/// Built once from the command line and shared by reference afterwards;
/// nothing mutates it once compilation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub style: OutputStyle,
    /// Emit comments pointing back at the original source lines.
    pub line_comments: bool,
    pub source_map: bool,
    /// Extra directories searched by `@import` and `@use`.
    pub import_paths: Vec<PathBuf>,
    pub precision: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            style: OutputStyle::default(),
            line_comments: false,
            source_map: false,
            import_paths: Vec::new(),
            precision: DEFAULT_PRECISION,
        }
    }
}

/// Split a colon delimited list of import directories, dropping empty entries.
pub fn parse_import_paths(list: &str) -> Vec<PathBuf> {
    list.split(':')
        .filter(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .collect()
}
