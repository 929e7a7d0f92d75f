use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn tmp_path(dst: &Path) -> PathBuf {
    let mut name = dst
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dst.with_file_name(name)
}

/// Writes `bytes` next to `dst` and renames it into place, so readers never see a partial file.
pub fn write_atomic(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let tmp = tmp_path(dst);

    let res = (|| {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("create temp file {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp file {}", tmp.display()))?;
        f.sync_all()
            .with_context(|| format!("flush temp file {}", tmp.display()))?;
        fs::rename(&tmp, dst)
            .with_context(|| format!("rename {} -> {}", tmp.display(), dst.display()))
    })();

    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}
