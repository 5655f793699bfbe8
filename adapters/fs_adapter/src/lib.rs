use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use globset::{GlobBuilder, GlobMatcher};
use log::{debug, warn};
use triage_core::domain::SourceFile;
use triage_core::ports::{EvidenceSource, Result};
use walkdir::WalkDir;

pub const DEFAULT_NAME_PATTERN: &str = "%.log";

/// Compiles a SQL `LIKE` style file name pattern: `%` matches any run, `_` a single
/// character. Matching ignores case.
pub fn name_matcher(pattern: &str) -> Result<GlobMatcher> {
    let mut glob = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '%' => glob.push('*'),
            '_' => glob.push('?'),
            c => glob.push_str(&globset::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    let matcher = GlobBuilder::new(&glob)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|e| format!("invalid name pattern {pattern}: {e}"))?
        .compile_matcher();
    Ok(matcher)
}

/// Filesystem implementation of the EvidenceSource port
///
/// Roots may be files or directories. Directories are walked recursively and every
/// regular file whose name matches the pattern is a candidate. Explicitly named
/// files are always taken. An input that cannot be accessed is skipped; discovery
/// fails only when none of them can.
pub struct FsEvidenceSource {
    roots: Vec<PathBuf>,
    name_matcher: GlobMatcher,
}

impl FsEvidenceSource {
    pub fn new(roots: Vec<PathBuf>, name_pattern: &str) -> Result<Self> {
        Ok(Self {
            roots,
            name_matcher: name_matcher(name_pattern)?,
        })
    }
}

impl EvidenceSource for FsEvidenceSource {
    fn find_files(&self) -> Result<Vec<SourceFile>> {
        let mut paths: Vec<(PathBuf, u64)> = Vec::new();
        let mut readable_roots = 0;

        for root in &self.roots {
            let metadata = match std::fs::metadata(root) {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("skipping input {}: {}", root.display(), e);
                    continue;
                }
            };
            readable_roots += 1;
            if metadata.is_file() {
                paths.push((root.clone(), metadata.len()));
                continue;
            }

            for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("skipping unreadable entry: {}", e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                if !self.name_matcher.is_match(entry.file_name()) {
                    continue;
                }
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                paths.push((entry.into_path(), size));
            }
        }

        if readable_roots == 0 && !self.roots.is_empty() {
            return Err("none of the inputs could be accessed".into());
        }

        paths.sort_by(|a, b| a.0.cmp(&b.0));
        paths.dedup_by(|a, b| a.0 == b.0);

        let files: Vec<SourceFile> = paths
            .into_iter()
            .enumerate()
            .map(|(index, (path, size))| SourceFile {
                id: index as u64 + 1,
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path,
                size,
            })
            .collect();
        debug!("found {} candidate files", files.len());
        Ok(files)
    }

    fn open(&self, file: &SourceFile) -> std::io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(&file.path)?))
    }
}
