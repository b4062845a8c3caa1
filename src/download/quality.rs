//! Quality extraction and classification from a file's extension and
//! whatever bit-rate/bit-depth metadata the peer reported.

use crate::persistence::QualityTier;

const LOSSLESS_EXTENSIONS: &[&str] = &["flac", "wav", "alac", "aiff"];

#[derive(Debug, Clone, Copy)]
pub struct FileQuality {
    pub bit_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub sample_rate: Option<u32>,
}

/// Classify a single file's quality from its extension and metadata.
///
/// - lossless: format in {flac, wav, alac, aiff}, OR bit_depth >= 16
///   combined with a lossless-capable format.
/// - high: mp3/aac >= 256 kbps.
/// - standard: >= 128 kbps.
/// - low: below that.
/// - unknown: no usable metadata.
pub fn classify(extension: &str, quality: FileQuality) -> QualityTier {
    let ext = extension.to_lowercase();
    if LOSSLESS_EXTENSIONS.contains(&ext.as_str()) {
        return QualityTier::Lossless;
    }
    if let Some(depth) = quality.bit_depth {
        if depth >= 16 && LOSSLESS_EXTENSIONS.contains(&ext.as_str()) {
            return QualityTier::Lossless;
        }
    }

    match (ext.as_str(), quality.bit_rate) {
        ("mp3" | "aac", Some(rate)) if rate >= 256 => QualityTier::High,
        (_, Some(rate)) if rate >= 128 => QualityTier::Standard,
        (_, Some(_)) => QualityTier::Low,
        _ => QualityTier::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flac_is_always_lossless() {
        let q = FileQuality { bit_rate: None, bit_depth: None, sample_rate: None };
        assert_eq!(classify("flac", q), QualityTier::Lossless);
    }

    #[test]
    fn mp3_tiers_by_bit_rate() {
        let high = FileQuality { bit_rate: Some(320), bit_depth: None, sample_rate: None };
        let standard = FileQuality { bit_rate: Some(192), bit_depth: None, sample_rate: None };
        let low = FileQuality { bit_rate: Some(96), bit_depth: None, sample_rate: None };
        assert_eq!(classify("mp3", high), QualityTier::High);
        assert_eq!(classify("mp3", standard), QualityTier::Standard);
        assert_eq!(classify("mp3", low), QualityTier::Low);
    }

    #[test]
    fn missing_metadata_is_unknown() {
        let q = FileQuality { bit_rate: None, bit_depth: None, sample_rate: None };
        assert_eq!(classify("mp3", q), QualityTier::Unknown);
    }
}
