//! Scoring and ranking peer search responses against a wishlist item.

use crate::clients::peer_search::PeerResponse;
use crate::download::quality::{self, FileQuality};
use crate::persistence::QualityTier;

#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub file_count_cap: f64,
    pub penalize_excess: bool,
    pub completeness_weight: f64,
    pub min_completeness_ratio: f64,
    pub require_complete: bool,
    pub preferred_formats: Vec<String>,
    pub min_bit_rate: Option<u32>,
    pub reject_lossless: bool,
    pub reject_low_quality: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            file_count_cap: 100.0,
            penalize_excess: true,
            completeness_weight: 200.0,
            min_completeness_ratio: 0.8,
            require_complete: false,
            preferred_formats: Vec::new(),
            min_bit_rate: None,
            reject_lossless: false,
            reject_low_quality: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub username: String,
    pub score: f64,
    pub quality_tier: QualityTier,
    pub quality_format: Option<String>,
    pub quality_bit_rate: Option<u32>,
    pub quality_bit_depth: Option<u32>,
    pub quality_sample_rate: Option<u32>,
    pub has_slot: bool,
    pub upload_speed: u64,
    pub file_count: usize,
    pub completeness_ratio: f64,
}

fn audio_extension(filename: &str) -> Option<String> {
    filename.rsplit('.').next().map(|s| s.to_lowercase())
}

/// The single best file in a response, by quality tier, so callers can
/// persist a concrete `(format, bit_rate, bit_depth, sample_rate)`
/// alongside the tier rather than just the tier alone.
struct BestFile {
    tier: QualityTier,
    format: String,
    bit_rate: Option<u32>,
    bit_depth: Option<u32>,
    sample_rate: Option<u32>,
}

fn best_file(response: &PeerResponse) -> Option<BestFile> {
    response
        .files
        .iter()
        .filter_map(|f| {
            let ext = audio_extension(&f.filename)?;
            let tier = quality::classify(
                &ext,
                FileQuality { bit_rate: f.bit_rate, bit_depth: f.bit_depth, sample_rate: f.sample_rate },
            );
            Some(BestFile { tier, format: ext, bit_rate: f.bit_rate, bit_depth: f.bit_depth, sample_rate: f.sample_rate })
        })
        .max_by_key(|b| b.tier)
}

/// The best quality tier among a response's files, for a tiebreak-free
/// single score per candidate (per-file quality still drives the
/// qualityScore term itself). Exposed so manual `select()` can classify
/// a peer's files without re-running the full scoring pass.
pub fn dominant_quality(response: &PeerResponse) -> QualityTier {
    best_file(response).map(|b| b.tier).unwrap_or(QualityTier::Unknown)
}

fn passes_quality_filters(response: &PeerResponse, config: &ScoringConfig) -> bool {
    if config.reject_lossless && dominant_quality(response) == QualityTier::Lossless {
        return false;
    }
    if config.reject_low_quality && matches!(dominant_quality(response), QualityTier::Low | QualityTier::Unknown) {
        return false;
    }
    if let Some(min_rate) = config.min_bit_rate {
        let has_acceptable = response.files.iter().any(|f| f.bit_rate.unwrap_or(0) >= min_rate);
        if !has_acceptable {
            return false;
        }
    }
    if !config.preferred_formats.is_empty() {
        let has_preferred = response.files.iter().any(|f| {
            audio_extension(&f.filename).map(|ext| config.preferred_formats.iter().any(|p| p.eq_ignore_ascii_case(&ext))).unwrap_or(false)
        });
        if !has_preferred {
            return false;
        }
    }
    true
}

/// `None` when the response fails a hard quality/completeness gate and
/// is filtered out entirely rather than merely scored low.
pub fn score_candidate(response: &PeerResponse, expected_track_count: usize, config: &ScoringConfig) -> Option<ScoredCandidate> {
    let music_files = response.files.iter().filter(|f| audio_extension(&f.filename).is_some()).count();
    let completeness_ratio = if expected_track_count == 0 {
        1.0
    } else {
        (music_files as f64 / expected_track_count as f64).min(1.0)
    };

    if config.require_complete && completeness_ratio < config.min_completeness_ratio {
        return None;
    }
    if !passes_quality_filters(response, config) {
        return None;
    }

    let best = best_file(response);
    let quality_tier = best.as_ref().map(|b| b.tier).unwrap_or(QualityTier::Unknown);
    let has_slot = response.has_slot.unwrap_or(false);
    let upload_speed = response.upload_speed.unwrap_or(0);

    let slot_score = if has_slot { 100.0 } else { 0.0 };
    let quality_score = quality_tier.score();
    let file_count_score = if config.penalize_excess && expected_track_count > 0 && music_files > expected_track_count {
        let excess = (music_files - expected_track_count) as f64;
        (config.file_count_cap - excess).max(0.0)
    } else {
        config.file_count_cap.min(music_files as f64 / expected_track_count.max(1) as f64 * config.file_count_cap)
    };
    let speed_score = (upload_speed as f64 / 10_000.0).min(100.0);
    let completeness_score = config.completeness_weight * completeness_ratio;

    let score = slot_score + quality_score + file_count_score + speed_score + completeness_score;

    Some(ScoredCandidate {
        username: response.username.clone(),
        score,
        quality_tier,
        quality_format: best.as_ref().map(|b| b.format.clone()),
        quality_bit_rate: best.as_ref().and_then(|b| b.bit_rate),
        quality_bit_depth: best.as_ref().and_then(|b| b.bit_depth),
        quality_sample_rate: best.as_ref().and_then(|b| b.sample_rate),
        has_slot,
        upload_speed,
        file_count: music_files,
        completeness_ratio,
    })
}

/// Descending by score; ties break on (slot, upload speed, file count).
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.has_slot.cmp(&a.has_slot))
            .then_with(|| b.upload_speed.cmp(&a.upload_speed))
            .then_with(|| b.file_count.cmp(&a.file_count))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::peer_search::PeerFile;

    fn response(username: &str, has_slot: bool, files: Vec<(&str, Option<u32>)>) -> PeerResponse {
        PeerResponse {
            username: username.into(),
            files: files
                .into_iter()
                .map(|(name, bit_rate)| PeerFile { filename: name.into(), size: 1_000_000, bit_rate, bit_depth: None, sample_rate: None })
                .collect(),
            has_slot: Some(has_slot),
            upload_speed: Some(0),
        }
    }

    #[test]
    fn higher_quality_outranks_lower_quality_at_equal_completeness() {
        let config = ScoringConfig::default();
        let lossless = response("a", true, vec![("01.flac", None), ("02.flac", None)]);
        let low = response("b", true, vec![("01.mp3", Some(96)), ("02.mp3", Some(96))]);
        let scored_lossless = score_candidate(&lossless, 2, &config).unwrap();
        let scored_low = score_candidate(&low, 2, &config).unwrap();
        assert!(scored_lossless.score > scored_low.score);
    }

    #[test]
    fn require_complete_filters_incomplete_candidates() {
        let config = ScoringConfig { require_complete: true, min_completeness_ratio: 0.9, ..Default::default() };
        let incomplete = response("a", true, vec![("01.mp3", Some(192))]);
        assert!(score_candidate(&incomplete, 10, &config).is_none());
    }

    #[test]
    fn ranking_breaks_ties_on_slot_then_speed() {
        let mut a = score_candidate(&response("a", true, vec![("01.mp3", Some(192))]), 1, &ScoringConfig::default()).unwrap();
        let mut b = score_candidate(&response("b", false, vec![("01.mp3", Some(192))]), 1, &ScoringConfig::default()).unwrap();
        a.score = 100.0;
        b.score = 100.0;
        let ranked = rank(vec![b, a.clone()]);
        assert_eq!(ranked[0].username, "a");
        let _ = &a;
    }
}
