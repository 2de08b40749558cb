//! Call-to-action label generation for repository cards.
//!
//! - [`storage`]: key-value storage the cache persists into
//! - [`cache`]: versioned, fingerprinted, 7-day generation cache
//! - [`extract`]: partial field extraction from streamed JSON
//! - [`engine`]: inference engine traits and lifecycle service
//! - [`openai`]: backend for OpenAI-compatible inference servers
//! - [`prompts`]: prompts and output schema
//! - [`generator`]: ties the above together

pub mod cache;
pub mod engine;
pub mod extract;
pub mod generator;
pub mod openai;
pub mod prompts;
pub mod state_bus;
pub mod storage;

pub use cache::{GenerationCache, fingerprint};
pub use engine::{EngineBackend, EngineError, EngineService, EngineState, EngineStatus, InferenceEngine};
pub use extract::{CtaResponse, PartialFieldExtractor, StreamAccumulator};
pub use generator::{CtaGenerator, FALLBACK_CTA, GeneratedCta};
pub use openai::OpenAiCompatibleBackend;
pub use prompts::RepoContext;
pub use state_bus::StateBus;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError, UnavailableStorage};
