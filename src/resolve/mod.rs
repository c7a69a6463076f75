use anyhow::{Context, Result};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

use crate::table::{Table, TableLoader};

/// Subdirectories probed, in priority order, before the bare file name.
pub const SEARCH_DIRS: [&str; 2] = ["datasets", "notebooks"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Paths under the working directory.
    WorkingDir,
    /// Paths under the filesystem root, tried only once the first phase is exhausted.
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub phase: Phase,
    pub path: PathBuf,
    /// Directory whose contents are logged before this candidate is probed.
    pub listed_dir: Option<PathBuf>,
}

/// Where the search starts. Both are injected so tests never touch `/`.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    pub cwd: PathBuf,
    pub root: PathBuf,
}

impl SearchRoots {
    pub fn new(cwd: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            root: root.into(),
        }
    }

    /// Process working directory and `/`.
    pub fn from_env() -> Result<Self> {
        let cwd = env::current_dir().context("reading current working directory")?;
        Ok(Self::new(cwd, "/"))
    }

    /// The six candidate paths for `file_name`, in probe order.
    pub fn candidates(&self, file_name: &str) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(2 * (SEARCH_DIRS.len() + 1));

        for dir in SEARCH_DIRS {
            let dir = self.cwd.join(dir);
            out.push(Candidate {
                phase: Phase::WorkingDir,
                path: dir.join(file_name),
                listed_dir: Some(dir),
            });
        }
        out.push(Candidate {
            phase: Phase::WorkingDir,
            path: self.cwd.join(file_name),
            listed_dir: None,
        });

        for dir in SEARCH_DIRS {
            out.push(Candidate {
                phase: Phase::Root,
                path: self.root.join(dir).join(file_name),
                listed_dir: None,
            });
        }
        // bare name, as given
        out.push(Candidate {
            phase: Phase::Root,
            path: PathBuf::from(file_name),
            listed_dir: None,
        });

        out
    }
}

#[derive(Debug)]
pub struct Resolved {
    pub path: PathBuf,
    pub table: Table,
}

/// Finds a file by name across the candidate locations; first parse wins.
pub struct Resolver<L> {
    roots: SearchRoots,
    loader: L,
}

impl<L: TableLoader> Resolver<L> {
    pub fn new(roots: SearchRoots, loader: L) -> Self {
        Self { roots, loader }
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// `Ok(None)` once every candidate has been tried without finding the
    /// file. A file that exists but fails to parse stops the search with an
    /// error.
    #[instrument(level = "info", skip(self))]
    pub fn resolve(&self, file_name: &str) -> Result<Option<Resolved>> {
        for candidate in self.roots.candidates(file_name) {
            if let Some(dir) = &candidate.listed_dir {
                log_directory(dir);
            }

            let path = candidate.path;
            info!(path = %path.display(), phase = ?candidate.phase, "attempting read");
            match self.loader.load(&path)? {
                Some(table) => {
                    info!(path = %path.display(), rows = table.num_rows(), "file found");
                    return Ok(Some(Resolved { path, table }));
                }
                None => info!(path = %path.display(), "file not found"),
            }
        }
        Ok(None)
    }
}

fn log_directory(dir: &Path) {
    // a missing or unreadable directory is just a non-match
    if let Ok(entries) = fs::read_dir(dir) {
        let names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        debug!(dir = %dir.display(), entries = ?names, "candidate directory contents");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CsvLoader;
    use anyhow::bail;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,datadive::resolve=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// Wraps a loader and remembers every path it was asked for.
    struct Recording<L> {
        inner: L,
        seen: RefCell<Vec<PathBuf>>,
    }

    impl<L> Recording<L> {
        fn new(inner: L) -> Self {
            Self {
                inner,
                seen: RefCell::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<PathBuf> {
            self.seen.borrow().clone()
        }
    }

    impl<L: TableLoader> TableLoader for Recording<L> {
        fn load(&self, path: &Path) -> Result<Option<Table>> {
            self.seen.borrow_mut().push(path.to_path_buf());
            self.inner.load(path)
        }
    }

    /// In-memory filesystem: known paths hold a one-column table.
    #[derive(Default)]
    struct Fixture {
        present: HashMap<PathBuf, i64>,
        malformed: HashSet<PathBuf>,
    }

    impl TableLoader for Fixture {
        fn load(&self, path: &Path) -> Result<Option<Table>> {
            if self.malformed.contains(path) {
                bail!("CSV parse error in {}", path.display());
            }
            let Some(v) = self.present.get(path) else {
                return Ok(None);
            };
            let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
            let table = Table::try_new(schema, vec![Arc::new(Int64Array::from(vec![*v]))])?;
            Ok(Some(table))
        }
    }

    #[test]
    fn candidates_follow_fixed_order() {
        let roots = SearchRoots::new("/work", "/");
        let paths: Vec<PathBuf> = roots
            .candidates("data.csv")
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/work/datasets/data.csv"),
                PathBuf::from("/work/notebooks/data.csv"),
                PathBuf::from("/work/data.csv"),
                PathBuf::from("/datasets/data.csv"),
                PathBuf::from("/notebooks/data.csv"),
                PathBuf::from("data.csv"),
            ]
        );
    }

    #[test]
    fn notebooks_hit_stops_in_working_dir_phase() -> Result<()> {
        init_test_logging();
        let cwd = tempdir()?;
        let root = tempdir()?;
        fs::create_dir(cwd.path().join("notebooks"))?;
        fs::write(cwd.path().join("notebooks/data.csv"), "a,b\n1,2\n")?;

        let loader = Recording::new(CsvLoader::default());
        let resolver = Resolver::new(SearchRoots::new(cwd.path(), root.path()), &loader);
        let found = resolver.resolve("data.csv")?.expect("file is present");

        assert_eq!(found.path, cwd.path().join("notebooks/data.csv"));
        assert_eq!(found.table.num_rows(), 1);
        assert_eq!(
            loader.seen(),
            vec![
                cwd.path().join("datasets/data.csv"),
                cwd.path().join("notebooks/data.csv"),
            ]
        );
        Ok(())
    }

    #[test]
    fn first_match_wins() -> Result<()> {
        let mut fixture = Fixture::default();
        fixture.present.insert("/w/datasets/d.csv".into(), 1);
        fixture.present.insert("/w/notebooks/d.csv".into(), 2);
        fixture.present.insert("/r/datasets/d.csv".into(), 3);

        let loader = Recording::new(fixture);
        let resolver = Resolver::new(SearchRoots::new("/w", "/r"), &loader);
        let found = resolver.resolve("d.csv")?.expect("file is present");

        assert_eq!(found.path, PathBuf::from("/w/datasets/d.csv"));
        assert_eq!(loader.seen().len(), 1);
        Ok(())
    }

    #[test]
    fn root_phase_runs_after_working_dir_is_exhausted() -> Result<()> {
        let mut fixture = Fixture::default();
        fixture.present.insert("/r/notebooks/d.csv".into(), 5);

        let loader = Recording::new(fixture);
        let resolver = Resolver::new(SearchRoots::new("/w", "/r"), &loader);
        let found = resolver.resolve("d.csv")?.expect("file is present");

        assert_eq!(found.path, PathBuf::from("/r/notebooks/d.csv"));
        assert_eq!(loader.seen().len(), 5);
        Ok(())
    }

    #[test]
    fn exhausting_both_phases_is_not_found() -> Result<()> {
        init_test_logging();
        let cwd = tempdir()?;
        let root = tempdir()?;

        let loader = Recording::new(CsvLoader::default());
        let resolver = Resolver::new(
            SearchRoots::new(cwd.path(), root.path()),
            &loader,
        );
        assert!(resolver.resolve("datadive_missing_input.csv")?.is_none());
        assert_eq!(loader.seen().len(), 6);
        Ok(())
    }

    #[test]
    fn malformed_file_stops_the_search() {
        let mut fixture = Fixture::default();
        fixture.malformed.insert("/w/notebooks/d.csv".into());
        fixture.present.insert("/w/d.csv".into(), 1);

        let loader = Recording::new(fixture);
        let resolver = Resolver::new(SearchRoots::new("/w", "/r"), &loader);

        assert!(resolver.resolve("d.csv").is_err());
        assert_eq!(loader.seen().len(), 2);
    }
}
