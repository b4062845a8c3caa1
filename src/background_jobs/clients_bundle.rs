//! A single handle background jobs reach external services through,
//! so `JobContext` doesn't need one field per client.

use crate::clients::{
    CoverArtClient, LibraryClient, MetadataClient, PeerSearchClient, RecommenderClient,
    RequestPacer, SimilarityClient,
};

#[derive(Clone)]
pub struct Clients {
    pub recommender: RecommenderClient,
    pub library: LibraryClient,
    pub similarity: SimilarityClient,
    pub metadata: MetadataClient,
    pub coverart: CoverArtClient,
    pub peer_search: PeerSearchClient,
    /// Shared across similarity lookups so consecutive calls respect
    /// the upstream's rate limit regardless of which job made them.
    pub similarity_pacer: RequestPacer,
}
