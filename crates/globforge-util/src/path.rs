use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base` unless it is already absolute, then normalize it.
pub fn abs_path<P: AsRef<Path>, B: AsRef<Path>>(path: P, base: B) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.as_ref().join(path))
    }
}

/// Lexically collapse `.` and `..` components. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                match last {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => out.push(".."),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Express `path` relative to `base` when it lives underneath it; otherwise return the
/// normalized path unchanged.
pub fn relative_to<P: AsRef<Path>, B: AsRef<Path>>(path: P, base: B) -> PathBuf {
    let path = normalize(path.as_ref());
    let base = normalize(base.as_ref());
    match path.strip_prefix(&base) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path,
    }
}

/// Directory containing `file`, or `.` for a bare file name.
pub fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn absolute_and_relative() {
        assert_eq!(abs_path("src/a.c", "/pkg"), PathBuf::from("/pkg/src/a.c"));
        assert_eq!(abs_path("/x/a.c", "/pkg"), PathBuf::from("/x/a.c"));
        assert_eq!(relative_to("/pkg/gen/cfg.h", "/pkg"), PathBuf::from("gen/cfg.h"));
        assert_eq!(relative_to("/other/cfg.h", "/pkg"), PathBuf::from("/other/cfg.h"));
        assert_eq!(parent_dir(Path::new("file.cfg")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/d/file.cfg")), PathBuf::from("/d"));
    }
}
