use anyhow::{anyhow, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub fn open(path: &Path, kind: &str) -> Result<File> {
    match File::open(path) {
        Err(e) => Err(anyhow!("Opening {} file `{}`: {}", kind, path.display(), e)),
        Ok(file) => Ok(file),
    }
}

/// Removes `dir` and everything in it. A missing `dir` is not an error.
pub fn rmdir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

/// Removes every entry under `dir`, leaving `dir` itself in place.
pub fn clear_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Recursively copies `src` into `dst`, creating `dst` if needed. File and
/// directory permission bits are carried over, except that copied
/// directories are always owner-writable so the next build can clear them.
/// Directory permissions are applied last.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    let mut directories = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            directories.push((target, entry.metadata()?.permissions()));
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    for (directory, mut permissions) in directories.into_iter().rev() {
        owner_writable(&mut permissions);
        fs::set_permissions(directory, permissions)?;
    }
    Ok(())
}

#[cfg(unix)]
fn owner_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn owner_writable(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_copy_dir() -> io::Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        fs::create_dir_all(src.path().join("css/fonts"))?;
        fs::write(src.path().join("style.css"), "body {}")?;
        fs::write(src.path().join("css/fonts/a.woff"), [0u8, 1, 2])?;

        let out = dst.path().join("static");
        copy_dir(src.path(), &out)?;
        assert_eq!(fs::read_to_string(out.join("style.css"))?, "body {}");
        assert_eq!(fs::read(out.join("css/fonts/a.woff"))?, vec![0u8, 1, 2]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_preserves_permissions() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        let script = src.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750))?;

        copy_dir(src.path(), &dst.path().join("static"))?;
        let mode = fs::metadata(dst.path().join("static/run.sh"))?.permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_directories_stay_clearable() -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        let locked = src.path().join("locked");
        fs::create_dir(&locked)?;
        fs::write(locked.join("a.txt"), "a")?;
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;

        let out = dst.path().join("static");
        let copied = copy_dir(src.path(), &out);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;
        copied?;

        let mode = fs::metadata(out.join("locked"))?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        clear_dir(dst.path())?;
        assert_eq!(fs::read_dir(dst.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_copy_missing_dir_fails() {
        let dst = tempfile::tempdir().unwrap();
        assert!(copy_dir(&dst.path().join("missing"), &dst.path().join("out")).is_err());
    }

    #[test]
    fn test_clear_dir() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("a/b"))?;
        fs::write(dir.path().join("a/b/c.txt"), "c")?;
        fs::write(dir.path().join("d.txt"), "d")?;

        clear_dir(dir.path())?;
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_rmdir_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(rmdir(&dir.path().join("missing")).is_ok());
    }
}
