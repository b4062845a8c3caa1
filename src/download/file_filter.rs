//! Filtering and grouping of a peer's offered files down to the ones
//! worth downloading.

use crate::clients::peer_search::PeerFile;
use std::collections::HashMap;

const ACCEPTED_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg", "opus", "wav", "aac", "wma", "alac"];

#[derive(Debug, Clone)]
pub struct FileFilterConfig {
    pub min_file_size_mb: f64,
    pub max_file_size_mb: f64,
    pub directory: Option<String>,
}

fn extension(filename: &str) -> Option<String> {
    filename.rsplit('.').next().map(|s| s.to_lowercase())
}

fn containing_directory(filename: &str) -> Option<&str> {
    filename.rsplit_once('/').map(|(dir, _)| dir)
}

pub fn accept(file: &PeerFile, config: &FileFilterConfig) -> bool {
    let Some(ext) = extension(&file.filename) else { return false };
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    let size_mb = file.size as f64 / (1024.0 * 1024.0);
    if size_mb < config.min_file_size_mb || size_mb > config.max_file_size_mb {
        return false;
    }
    if let Some(directory) = &config.directory {
        if containing_directory(&file.filename) != Some(directory.as_str()) {
            return false;
        }
    }
    true
}

pub fn filter_files<'a>(files: &'a [PeerFile], config: &FileFilterConfig) -> Vec<&'a PeerFile> {
    files.iter().filter(|f| accept(f, config)).collect()
}

/// "Prefer album folder": group accepted files by their containing
/// directory, and return the group with the highest quality-adjusted
/// completeness (here approximated as group size, since quality tiers
/// are resolved downstream by `scoring`).
pub fn group_by_directory<'a>(files: &[&'a PeerFile]) -> HashMap<String, Vec<&'a PeerFile>> {
    let mut groups: HashMap<String, Vec<&PeerFile>> = HashMap::new();
    for file in files {
        let dir = containing_directory(&file.filename).unwrap_or("").to_string();
        groups.entry(dir).or_default().push(file);
    }
    groups
}

pub fn preferred_directory<'a>(files: &[&'a PeerFile]) -> Option<String> {
    group_by_directory(files)
        .into_iter()
        .max_by_key(|(_, group)| group.len())
        .map(|(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> PeerFile {
        PeerFile { filename: name.into(), size, bit_rate: None, bit_depth: None, sample_rate: None }
    }

    #[test]
    fn rejects_non_audio_extensions() {
        let config = FileFilterConfig { min_file_size_mb: 0.0, max_file_size_mb: 1000.0, directory: None };
        assert!(!accept(&file("cover.jpg", 1_000_000), &config));
        assert!(accept(&file("track.flac", 20_000_000), &config));
    }

    #[test]
    fn rejects_files_outside_size_bounds() {
        let config = FileFilterConfig { min_file_size_mb: 2.0, max_file_size_mb: 10.0, directory: None };
        assert!(!accept(&file("track.mp3", 1_000_000), &config));
        assert!(accept(&file("track.mp3", 5_000_000), &config));
    }

    #[test]
    fn prefers_directory_with_most_accepted_files() {
        let files = vec![
            file("Album/01.flac", 20_000_000),
            file("Album/02.flac", 20_000_000),
            file("Other/01.mp3", 5_000_000),
        ];
        let refs: Vec<&PeerFile> = files.iter().collect();
        assert_eq!(preferred_directory(&refs), Some("Album".to_string()));
    }
}
