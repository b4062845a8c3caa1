//! Cover-art URL builder. Deterministic, no I/O: the actual fetch (if
//! any) happens client-side, this just builds the URL the way the
//! Cover Art Archive's convention does for a release id.

pub struct CoverArtClient {
    base_url: String,
}

impl CoverArtClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    /// `size` is clamped to the nearest supported thumbnail size.
    pub fn cover_url(&self, id: &str, size: u32) -> String {
        let size = match size {
            0..=374 => 250,
            375..=849 => 500,
            _ => 1200,
        };
        format!("{}/release/{}/front-{}", self.base_url, id, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_nearest_supported_size() {
        let client = CoverArtClient::new("https://coverart.example".into());
        assert!(client.cover_url("abc", 250).ends_with("front-250"));
        assert!(client.cover_url("abc", 600).ends_with("front-500"));
        assert!(client.cover_url("abc", 2000).ends_with("front-1200"));
    }
}
