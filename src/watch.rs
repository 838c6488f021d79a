use notify_debouncer_mini::{
    new_debouncer, notify::RecursiveMode, DebounceEventResult, DebouncedEvent, DebouncedEventKind,
};
use std::{
    io,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use crate::{
    change_suffix, is_partial, is_sass_source, resolve_dependents, Compiler, Dispatcher, Error,
};

/// Quiet period after the last write before a change counts as settled.
const DEBOUNCE_MS: u64 = 200;

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Notify error: {0}")]
    Notify(#[from] notify_debouncer_mini::notify::Error),
    #[error("invalid watch argument {0:?}, expected <infile:outfile> or <indir:outdir>")]
    InvalidTarget(String),
    #[error("cannot watch {0}: {1}")]
    MissingInput(PathBuf, io::Error),
    #[error("watching directory {0} needs an output directory (<indir:outdir>)")]
    MissingOutputDir(PathBuf),
    #[error("output directory does not exist: {0}")]
    OutputDirNotFound(PathBuf),
    #[error(transparent)]
    Resolve(#[from] Error),
}

impl WatchError {
    /// Whether the watch loop has to stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, WatchError::Resolve(Error::NoNonPartial(_)))
    }
}

/// What `--watch` points at. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// One source file, compiled to `output` or stdout.
    File {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Every Sass file in `input` compiles to a `.css` file of the same
    /// name in `output`.
    Directory { input: PathBuf, output: PathBuf },
}

impl WatchTarget {
    /// Parse and validate an `<in:out>` watch argument.
    ///
    /// A single file may omit `:out`, in which case `fallback_output` is
    /// used (stdout if that is `None` too). Both directories of a directory
    /// watch must already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is malformed or a path is missing.
    pub fn parse(arg: &str, fallback_output: Option<&Path>) -> Result<Self, WatchError> {
        let (input, output) = match arg.split_once(':') {
            Some((input, output)) => (input, Some(output)),
            None => (arg, None),
        };
        if input.is_empty() || output.is_some_and(str::is_empty) {
            return Err(WatchError::InvalidTarget(arg.to_string()));
        }

        let input = Path::new(input)
            .canonicalize()
            .map_err(|e| WatchError::MissingInput(PathBuf::from(input), e))?;

        if input.is_dir() {
            let output = output.ok_or_else(|| WatchError::MissingOutputDir(input.clone()))?;
            let output = match Path::new(output).canonicalize() {
                Ok(output) if output.is_dir() => output,
                _ => return Err(WatchError::OutputDirNotFound(PathBuf::from(output))),
            };
            Ok(WatchTarget::Directory { input, output })
        } else {
            let output = output
                .map(PathBuf::from)
                .or_else(|| fallback_output.map(Path::to_path_buf));
            Ok(WatchTarget::File { input, output })
        }
    }

    /// The directory registered with the filesystem watcher.
    pub fn watched_dir(&self) -> &Path {
        match self {
            WatchTarget::File { input, .. } => input.parent().unwrap_or(input),
            WatchTarget::Directory { input, .. } => input,
        }
    }
}

/// The mini debouncer only reports [`ChangeKind::Settled`] and
/// [`ChangeKind::Changed`]; it cannot tell creates, deletes and renames apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Content changed and more writes may follow.
    Changed,
    /// No further writes arrived within the debounce window.
    Settled,
    Created,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn settled(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Settled,
        }
    }
}

impl From<DebouncedEvent> for ChangeEvent {
    fn from(event: DebouncedEvent) -> Self {
        let kind = match event.kind {
            DebouncedEventKind::Any => ChangeKind::Settled,
            _ => ChangeKind::Changed,
        };
        Self {
            path: event.path,
            kind,
        }
    }
}

/// A file to compile in response to a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

/// Maps filesystem changes to compile jobs and runs them.
pub struct WatchController<'a, C> {
    target: WatchTarget,
    dispatcher: Dispatcher<'a, C>,
}

impl<'a, C: Compiler> WatchController<'a, C> {
    pub fn new(target: WatchTarget, dispatcher: Dispatcher<'a, C>) -> Self {
        Self { target, dispatcher }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Decide which files a change has to recompile.
    ///
    /// Only settled changes count. In directory mode a change to a partial
    /// recompiles every non-partial file next to it; the partial itself is
    /// never compiled.
    ///
    /// # Errors
    ///
    /// Fails if the dependents of a partial cannot be resolved.
    pub fn plan(&self, event: &ChangeEvent) -> Result<Vec<CompileJob>, WatchError> {
        if event.kind != ChangeKind::Settled {
            tracing::trace!(
                path = %event.path.display(),
                kind = ?event.kind,
                "change not settled yet"
            );
            return Ok(Vec::new());
        }

        match &self.target {
            WatchTarget::File { input, output } => {
                if event.path != *input {
                    return Ok(Vec::new());
                }
                Ok(vec![CompileJob {
                    input: input.clone(),
                    output: output.clone(),
                }])
            }
            WatchTarget::Directory { input, output } => {
                let path = &event.path;
                if !path.is_file() {
                    tracing::debug!(path = %path.display(), "ignoring change to missing file");
                    return Ok(Vec::new());
                }
                let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                    tracing::debug!(path = %path.display(), "ignoring non UTF-8 file name");
                    return Ok(Vec::new());
                };
                if !is_sass_source(name) {
                    return Ok(Vec::new());
                }

                let sources = if is_partial(name) {
                    resolve_dependents(path.parent().unwrap_or(input), name)?
                } else {
                    vec![path.clone()]
                };

                Ok(sources
                    .into_iter()
                    .filter_map(|source| {
                        let css = change_suffix(source.file_name()?.to_str()?)?;
                        Some(CompileJob {
                            output: Some(output.join(css)),
                            input: source,
                        })
                    })
                    .collect())
            }
        }
    }

    /// Run every job a change calls for, to completion.
    ///
    /// A failed job is reported and does not stop the remaining ones.
    /// Returns the number of jobs attempted.
    ///
    /// # Errors
    ///
    /// Fails if planning fails; see [`WatchController::plan`].
    pub fn handle(&self, event: &ChangeEvent) -> Result<usize, WatchError> {
        let jobs = self.plan(event)?;
        for job in &jobs {
            if let Err(e) = self
                .dispatcher
                .compile_file(&job.input, job.output.as_deref())
            {
                tracing::error!("{e}");
            }
        }
        Ok(jobs.len())
    }
}

/// Block on filesystem changes for the controller's target and handle them
/// one at a time.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created, fails to watch or if
/// handling a change fails fatally.
pub fn watch<C: Compiler>(controller: &WatchController<'_, C>) -> Result<(), WatchError> {
    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(Duration::from_millis(DEBOUNCE_MS), tx)?;

    let dir = controller.target().watched_dir();
    debouncer
        .watcher()
        .watch(dir, RecursiveMode::NonRecursive)?;
    tracing::info!("Watching {}", dir.display());

    for events_res in rx {
        for event in events_res? {
            match controller.handle(&ChangeEvent::from(event)) {
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::error!("{e}"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dispatch::tests::RecordingCompiler, CompileError, CompilerConfig};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        input: PathBuf,
        output: PathBuf,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("scss");
        let output = root.path().join("css");
        fs::create_dir(&input).unwrap();
        fs::create_dir(&output).unwrap();
        for name in files {
            fs::write(input.join(name), "a { b: c; }").unwrap();
        }
        Fixture {
            input: input.canonicalize().unwrap(),
            output: output.canonicalize().unwrap(),
            _root: root,
        }
    }

    fn directory_target(f: &Fixture) -> WatchTarget {
        WatchTarget::parse(
            &format!("{}:{}", f.input.display(), f.output.display()),
            None,
        )
        .unwrap()
    }

    fn ok_compiler() -> RecordingCompiler {
        RecordingCompiler::answering(Ok("a{b:c}".to_string()))
    }

    #[test]
    fn partial_change_recompiles_every_non_partial() {
        let f = fixture(&["a.scss", "b.scss", "_shared.scss"]);
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        let handled = controller
            .handle(&ChangeEvent::settled(f.input.join("_shared.scss")))
            .unwrap();

        assert_eq!(handled, 2);
        let mut compiled = compiler.compiled_paths();
        compiled.sort();
        assert_eq!(compiled, vec![f.input.join("a.scss"), f.input.join("b.scss")]);
        assert!(f.output.join("a.css").exists());
        assert!(f.output.join("b.css").exists());
        assert!(!f.output.join("_shared.css").exists());
    }

    #[test]
    fn non_partial_change_compiles_just_that_file() {
        let f = fixture(&["a.scss", "b.scss"]);
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        let jobs = controller
            .plan(&ChangeEvent::settled(f.input.join("b.scss")))
            .unwrap();

        assert_eq!(
            jobs,
            vec![CompileJob {
                input: f.input.join("b.scss"),
                output: Some(f.output.join("b.css")),
            }]
        );
    }

    #[test]
    fn unsettled_changes_are_ignored() {
        let f = fixture(&["a.scss", "_shared.scss"]);
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        for kind in [
            ChangeKind::Changed,
            ChangeKind::Created,
            ChangeKind::Deleted,
            ChangeKind::Renamed,
        ] {
            let event = ChangeEvent {
                path: f.input.join("_shared.scss"),
                kind,
            };
            assert_eq!(controller.handle(&event).unwrap(), 0);
        }
        assert!(compiler.calls.borrow().is_empty());
    }

    #[test]
    fn deleted_and_foreign_files_are_ignored() {
        let f = fixture(&["a.scss"]);
        fs::write(f.input.join("notes.txt"), "").unwrap();
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        let gone = ChangeEvent::settled(f.input.join("removed.scss"));
        let text = ChangeEvent::settled(f.input.join("notes.txt"));
        assert_eq!(controller.handle(&gone).unwrap(), 0);
        assert_eq!(controller.handle(&text).unwrap(), 0);
        assert!(compiler.calls.borrow().is_empty());
    }

    #[test]
    fn partial_without_dependents_reports_and_keeps_watching() {
        let f = fixture(&["_only.scss"]);
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        let err = controller
            .handle(&ChangeEvent::settled(f.input.join("_only.scss")))
            .unwrap_err();

        assert!(matches!(err, WatchError::Resolve(Error::NoNonPartial(_))));
        assert!(!err.is_fatal());
        assert!(compiler.calls.borrow().is_empty());
    }

    #[test]
    fn vanished_watch_directory_ignores_partial_changes() {
        let f = fixture(&["a.scss", "_shared.scss"]);
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));
        fs::remove_dir_all(&f.input).unwrap();

        let handled = controller
            .handle(&ChangeEvent::settled(f.input.join("_shared.scss")))
            .unwrap();

        assert_eq!(handled, 0);
        assert!(compiler.calls.borrow().is_empty());
    }

    #[test]
    fn debouncer_events_only_settle_or_change() {
        let settled = ChangeEvent::from(DebouncedEvent {
            path: PathBuf::from("a.scss"),
            kind: DebouncedEventKind::Any,
        });
        let continuous = ChangeEvent::from(DebouncedEvent {
            path: PathBuf::from("a.scss"),
            kind: DebouncedEventKind::AnyContinuous,
        });
        assert_eq!(settled, ChangeEvent::settled("a.scss"));
        assert_eq!(continuous.kind, ChangeKind::Changed);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_skipped() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let f = fixture(&["a.scss"]);
        let odd = f.input.join(OsStr::from_bytes(b"caf\xe9.scss"));
        fs::write(&odd, "a { b: c; }").unwrap();
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        assert_eq!(controller.handle(&ChangeEvent::settled(odd)).unwrap(), 0);
        assert!(compiler.calls.borrow().is_empty());
    }

    #[test]
    fn listing_failures_stop_the_watch() {
        let err = WatchError::from(
            resolve_dependents(Path::new("/no/such/dir"), "_a.scss").unwrap_err(),
        );
        assert!(matches!(err, WatchError::Resolve(Error::ReadDir(..))), "got {err:?}");
        assert!(err.is_fatal());
        assert!(!WatchError::Resolve(Error::NoNonPartial(PathBuf::from("x"))).is_fatal());
    }

    #[test]
    fn failed_compile_does_not_stop_siblings() {
        let f = fixture(&["a.scss", "b.scss", "c.scss", "_shared.scss"]);
        let config = CompilerConfig::default();
        let compiler = RecordingCompiler::answering(Err(CompileError::from_message("boom")));
        let controller =
            WatchController::new(directory_target(&f), Dispatcher::new(&compiler, &config));

        let handled = controller
            .handle(&ChangeEvent::settled(f.input.join("_shared.scss")))
            .unwrap();

        assert_eq!(handled, 3);
        assert_eq!(compiler.calls.borrow().len(), 3);
    }

    #[test]
    fn single_file_mode_only_reacts_to_its_file() {
        let f = fixture(&["main.scss", "other.scss"]);
        let out = f.output.join("main.css");
        let target = WatchTarget::parse(
            &format!("{}:{}", f.input.join("main.scss").display(), out.display()),
            None,
        )
        .unwrap();
        let config = CompilerConfig::default();
        let compiler = ok_compiler();
        let controller = WatchController::new(target, Dispatcher::new(&compiler, &config));

        assert_eq!(
            controller
                .handle(&ChangeEvent::settled(f.input.join("other.scss")))
                .unwrap(),
            0
        );
        assert_eq!(
            controller
                .handle(&ChangeEvent::settled(f.input.join("main.scss")))
                .unwrap(),
            1
        );
        assert_eq!(fs::read_to_string(out).unwrap(), "a{b:c}");
    }

    #[test]
    fn single_file_target_falls_back_to_output_flag() {
        let f = fixture(&["main.scss"]);
        let input = f.input.join("main.scss");
        let fallback = f.output.join("site.css");

        let target =
            WatchTarget::parse(&input.display().to_string(), Some(fallback.as_path())).unwrap();
        assert_eq!(
            target,
            WatchTarget::File {
                input: input.clone(),
                output: Some(fallback),
            }
        );
        assert_eq!(target.watched_dir(), f.input.as_path());
    }

    #[test]
    fn directory_target_requires_existing_output_dir() {
        let f = fixture(&[]);
        let missing = f.output.join("nope");

        let err = WatchTarget::parse(
            &format!("{}:{}", f.input.display(), missing.display()),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, WatchError::OutputDirNotFound(ref p) if p == &missing));

        let err = WatchTarget::parse(&f.input.display().to_string(), None).unwrap_err();
        assert!(matches!(err, WatchError::MissingOutputDir(_)));
    }

    #[test]
    fn malformed_targets_are_rejected() {
        assert!(matches!(
            WatchTarget::parse(":out", None),
            Err(WatchError::InvalidTarget(_))
        ));
        assert!(matches!(
            WatchTarget::parse("in:", None),
            Err(WatchError::InvalidTarget(_))
        ));
        assert!(matches!(
            WatchTarget::parse("/definitely/not/here.scss:out.css", None),
            Err(WatchError::MissingInput(..))
        ));
    }
}
