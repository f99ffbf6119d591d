//! Peer-network search result processing.
//!
//! # Architecture
//!
//! - **quality** - codec labels and ranking scores
//! - **parser** - raw peer listings to [`TrackResult`]s with inferred tags
//! - **album** - folder grouping into [`AlbumResult`]s
//! - **orchestrator** - progressive polling of the search backend
//!
//! # Usage
//!
//! ```ignore
//! use soulsync::search::{CancelFlag, SearchOrchestrator};
//!
//! let orchestrator = SearchOrchestrator::new(Arc::new(slskd));
//! let results = orchestrator
//!     .search("queen bohemian rhapsody", Duration::from_secs(30), &CancelFlag::new(), |p| {
//!         println!("{} peers so far", p.response_count);
//!         Ok(())
//!     })
//!     .await;
//! ```

pub mod album;
pub mod orchestrator;
pub mod parser;
pub mod quality;

pub use album::{AlbumResult, aggregate};
pub use orchestrator::{CancelFlag, SearchOrchestrator, SearchProgress, SearchResults};
pub use parser::{RawFile, RawSearchResponse, TrackResult, parse_response};
pub use quality::{AudioQuality, PeerStats};
