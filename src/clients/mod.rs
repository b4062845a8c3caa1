//! External service adapters.

pub mod coverart;
pub mod library;
pub mod metadata;
pub mod pacing;
pub mod peer_search;
pub mod recommender;
pub mod similarity;

pub use coverart::CoverArtClient;
pub use library::LibraryClient;
pub use metadata::MetadataClient;
pub use pacing::RequestPacer;
pub use peer_search::PeerSearchClient;
pub use recommender::RecommenderClient;
pub use similarity::SimilarityClient;
