use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Drop `.` components, so `./img/a.png` and `img/a.png` are recorded as the same file.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// Writer for the output directory. Every file written through it is recorded, so the link checker
/// can tell which routes exist.
pub struct Out {
    prefix: PathBuf,
    written: Mutex<BTreeSet<PathBuf>>,
}

impl Out {
    /// Create a new out writer at `path`.
    ///
    /// # Warning
    ///
    /// This recursively removes everything currently at `path`.
    pub fn at(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let _ = std::fs::remove_dir_all(path);
        fs::create_dir_all(path)?;

        Ok(Out {
            prefix: path.canonicalize()?,
            written: Mutex::new(BTreeSet::new()),
        })
    }

    fn record(&self, out_file: &Path) {
        self.written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(normalize(out_file));
    }

    /// Copy a file by copying all bytes from `in_file` to `out_file`. This does not copy file
    /// attributes. Recursively creates `out_path` if it or its directory does not yet exist.
    pub fn copy_file(
        &self,
        in_file: impl AsRef<Path>,
        out_file: impl AsRef<Path>,
    ) -> anyhow::Result<()> {
        let mut fr = File::open(in_file)?;
        self.update_file(&mut fr, out_file)?;

        Ok(())
    }

    /// Write a file with the given `content` to `out_file`. Recursively creates `out_path` if it or
    /// its directory does not yet exist.
    pub fn update_file(
        &self,
        content: &mut impl Read,
        out_file: impl AsRef<Path>,
    ) -> anyhow::Result<()> {
        let out_file = out_file.as_ref();
        let target = self.prefix.join(out_file);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut fw = File::create(target)?;
        io::copy(content, &mut fw)?;
        self.record(out_file);

        Ok(())
    }

    /// Copy all files and directories from `in_dir` to `out_dir`. Files are copied by copying bytes.
    /// This does not copy file/directory attributes.
    pub fn copy_dir(
        &self,
        in_dir: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> anyhow::Result<()> {
        let in_dir = in_dir.as_ref();
        let out_dir = out_dir.as_ref();

        for entry in walkdir::WalkDir::new(in_dir).follow_links(true) {
            let entry = entry?;
            let target = out_dir.join(entry.path().strip_prefix(in_dir)?);
            if entry.file_type().is_dir() {
                let target = self.prefix.join(target);
                fs::create_dir_all(target)?;
            } else if entry.file_type().is_file() {
                self.copy_file(entry.path(), target)?;
            }
        }

        Ok(())
    }

    /// All files written so far, relative to the output directory.
    pub fn written(&self) -> Vec<PathBuf> {
        self.written
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }
}

#[cfg(test)]
mod test {
    use super::Out;
    use std::path::{Path, PathBuf};

    #[test]
    fn records_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = Out::at(dir.path().join("out")).unwrap();

        out.update_file(&mut "<p>hi</p>".as_bytes(), Path::new("blog").join("index.html"))
            .unwrap();

        let assets = dir.path().join("static");
        std::fs::create_dir_all(assets.join("img")).unwrap();
        std::fs::write(assets.join("img").join("logo.svg"), "<svg/>").unwrap();
        out.copy_dir(&assets, ".").unwrap();

        assert_eq!(
            std::fs::read_to_string(out.prefix().join("blog").join("index.html")).unwrap(),
            "<p>hi</p>"
        );
        assert_eq!(
            out.written(),
            [
                PathBuf::from("blog").join("index.html"),
                PathBuf::from("img").join("logo.svg"),
            ]
        );
    }
}
