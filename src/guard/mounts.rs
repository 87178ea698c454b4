use std::path::{Path, PathBuf};

/// Information about a mount point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub device: String,
    pub path: PathBuf,
    pub fs_type: String,
}

impl MountPoint {
    pub fn is_network(&self) -> bool {
        is_network_filesystem(&self.fs_type, &self.device)
    }
}

/// Filesystem types served over the network.
const NETWORK_FS: &[&str] = &[
    "nfs",
    "nfs4",
    "cifs",
    "smb3",
    "smbfs",
    "sshfs",
    "fuse.sshfs",
    "9p",
    "afs",
    "ceph",
    "glusterfs",
    "fuse.glusterfs",
    "davfs",
    "fuse.rclone",
];

/// Check if a filesystem type is network-backed
pub fn is_network_filesystem(fs_type: &str, device: &str) -> bool {
    if NETWORK_FS.contains(&fs_type) {
        return true;
    }

    // `//server/share` and `host:/export` style sources
    device.starts_with("//") || (device.contains(":/") && !device.starts_with('/'))
}

/// Read the mount table of the running system.
#[cfg(target_os = "linux")]
pub fn load() -> std::io::Result<Vec<MountPoint>> {
    let content = std::fs::read_to_string("/proc/mounts")?;
    Ok(parse_mounts(&content))
}

#[cfg(not(target_os = "linux"))]
pub fn load() -> std::io::Result<Vec<MountPoint>> {
    Ok(Vec::new())
}

/// Parse `/proc/mounts` formatted content.
pub fn parse_mounts(content: &str) -> Vec<MountPoint> {
    let mut mounts = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();

        if parts.len() < 3 {
            continue;
        }

        mounts.push(MountPoint {
            device: unescape(parts[0]),
            path: PathBuf::from(unescape(parts[1])),
            fs_type: parts[2].to_string(),
        });
    }

    mounts
}

/// Find the mount point containing `path` (longest prefix wins).
pub fn containing_mount<'a>(mounts: &'a [MountPoint], path: &Path) -> Option<&'a MountPoint> {
    mounts
        .iter()
        .filter(|m| path.starts_with(&m.path))
        .max_by_key(|m| m.path.components().count())
}

/// Decode the octal escapes (`\040` for space) used in the mount table.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}
