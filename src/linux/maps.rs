//! `/proc/<pid>/maps` parsing

use std::path::Path;

/// One line of a maps file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsEntry {
    pub start: usize,
    pub end: usize,
    pub readable: bool,
    pub writeable: bool,
    pub executable: bool,
    pub shared: bool,
    pub offset: usize,
    pub inode: u64,
    pub path: Option<String>,
}

impl MapsEntry {
    pub fn size(&self) -> usize {
        self.end - self.start
    }

    /// Any access at all; PROT_NONE mappings are reservations
    pub fn is_accessible(&self) -> bool {
        self.readable || self.writeable || self.executable
    }

    pub fn is_backed_by(&self, file: &Path) -> bool {
        self.path.as_deref().map(Path::new) == Some(file)
    }
}

/// Parses one maps line; `None` for malformed lines
pub fn parse_line(line: &str) -> Option<MapsEntry> {
    let mut split = line.trim_end().splitn(6, ' ');

    let mut range = split.next()?.split('-');
    let start = usize::from_str_radix(range.next()?, 16).ok()?;
    let end = usize::from_str_radix(range.next()?, 16).ok()?;
    if end < start {
        return None;
    }

    let perms = split.next()?.as_bytes();
    if perms.len() < 4 {
        return None;
    }

    let offset = usize::from_str_radix(split.next()?, 16).ok()?;
    let _dev = split.next()?;
    let inode = split.next()?.parse().ok()?;
    let path = split
        .next()
        .map(str::trim_start)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Some(MapsEntry {
        start,
        end,
        readable: perms[0] == b'r',
        writeable: perms[1] == b'w',
        executable: perms[2] == b'x',
        shared: perms[3] == b's',
        offset,
        inode,
        path,
    })
}

/// Parses a whole maps file, skipping malformed lines
pub fn parse_maps(contents: &str) -> Vec<MapsEntry> {
    contents.lines().filter_map(parse_line).collect()
}

/// Union of the mappings backed by `exe`
pub fn image_range(entries: &[MapsEntry], exe: &Path) -> Option<(usize, usize)> {
    entries
        .iter()
        .filter(|entry| entry.is_backed_by(exe))
        .fold(None, |range, entry| match range {
            None => Some((entry.start, entry.end)),
            Some((start, end)) => Some((start.min(entry.start), end.max(entry.end))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
55d0c0a00000-55d0c0a02000 r--p 00000000 08:01 1311 /usr/bin/probe
55d0c0a02000-55d0c0a06000 r-xp 00002000 08:01 1311 /usr/bin/probe
55d0c0a06000-55d0c0a07000 rw-p 00006000 08:01 1311 /usr/bin/probe
55d0c1e00000-55d0c1e21000 rw-p 00000000 00:00 0                          [heap]
7f2a10000000-7f2a10001000 ---p 00000000 00:00 0
7f2a10001000-7f2a10002000 rw-s 00000000 00:05 77 /dev/shm/with space
garbage line
";

    #[test]
    fn test_parse_file_backed_line() {
        let entries = parse_maps(SAMPLE);
        assert_eq!(entries.len(), 6);

        let text = &entries[1];
        assert_eq!(text.start, 0x55d0c0a02000);
        assert_eq!(text.size(), 0x4000);
        assert!(text.readable && text.executable && !text.writeable);
        assert_eq!(text.offset, 0x2000);
        assert_eq!(text.inode, 1311);
        assert_eq!(text.path.as_deref(), Some("/usr/bin/probe"));
    }

    #[test]
    fn test_parse_padded_and_anonymous() {
        let entries = parse_maps(SAMPLE);
        assert_eq!(entries[3].path.as_deref(), Some("[heap]"));
        assert_eq!(entries[4].path, None);
        assert!(!entries[4].is_accessible());
        assert!(entries[5].shared);
        assert_eq!(entries[5].path.as_deref(), Some("/dev/shm/with space"));
    }

    #[test]
    fn test_image_range_spans_all_segments() {
        let entries = parse_maps(SAMPLE);
        assert_eq!(
            image_range(&entries, Path::new("/usr/bin/probe")),
            Some((0x55d0c0a00000, 0x55d0c0a07000))
        );
        assert_eq!(image_range(&entries, Path::new("/usr/bin/other")), None);
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(parse_line("2000-1000 r--p 00000000 00:00 0").is_none());
    }
}
