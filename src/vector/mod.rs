//! Note embeddings on disk and in memory
//!
//! - [`codec`]: base64 embedding packing and content hashes
//! - [`index`]: exact cosine nearest-neighbor search
//! - [`store`]: the persisted `id -> (embedding, hash)` map

pub mod codec;
pub mod index;
pub mod store;

pub use index::{IndexError, NearestNeighborIndex, Neighbor};
pub use store::{NoteVectorRecord, VectorStore, VectorStoreError, STORE_VERSION};
