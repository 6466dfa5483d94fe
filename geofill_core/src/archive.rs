use geofill_runtime::{ArchiveEntry, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveUpsert {
    Inserted,
    Updated,
}

/// Store `data` under `name`, replacing an existing entry with the same name in place.
pub fn upsert_archive(
    archives: &mut Vec<ArchiveEntry>,
    name: &str,
    data: Profile,
    timestamp: i64,
) -> ArchiveUpsert {
    let entry = ArchiveEntry {
        name: name.to_string(),
        data,
        timestamp,
    };
    match archives.iter_mut().find(|existing| existing.name == name) {
        Some(existing) => {
            *existing = entry;
            ArchiveUpsert::Updated
        }
        None => {
            archives.push(entry);
            ArchiveUpsert::Inserted
        }
    }
}

pub fn remove_archive(archives: &mut Vec<ArchiveEntry>, index: usize) -> Option<ArchiveEntry> {
    (index < archives.len()).then(|| archives.remove(index))
}
