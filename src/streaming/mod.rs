//! Stream normalization
//!
//! Consumes a provider-specific incremental response and produces a lazy
//! sequence of canonical stream parts. Provider adapters supply a
//! [`ChunkSchema`] that maps their raw chunks into the closed
//! [`StreamChunk`] taxonomy; the core never branches on provider identity.

mod chunk;
mod normalizer;
mod part;
mod sse;

pub use chunk::{ChunkSchema, StreamChunk};
pub use normalizer::normalize;
pub use part::{PartStream, StreamPart};
pub use sse::{SseChunkConfig, sse_json_chunks};
