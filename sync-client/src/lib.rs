//! # sync-client
//!
//! Client library for changeq synced collections.
//!
//! This is the library applications use to persist objects and collections
//! over HTTP.
//!
//! ## Features
//!
//! - **Transactions**: `Syncer::sync` maps read/create/update/delete to one
//!   request, with pre-flight veto, minimum latency and no retries
//! - **Change Queue**: ordered, batched delivery of add/remove/move records
//!   with at most one flush in flight and requeue on failure
//! - **Sparse Collections**: page responses fill positions by offset
//! - **Transport Abstraction**: Pluggable HTTP layer (reqwest, mock)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use changeq_sync_client::{ClientConfig, MutationOptions, ReqwestTransport, SyncedCollection, Syncer};
//!
//! let config = ClientConfig::from_file("changeq.toml".as_ref())?;
//! let syncer = Arc::new(Syncer::new(ReqwestTransport::from_config(&config.transport)?));
//! let mut album = SyncedCollection::new(syncer, "/albums/1/photos", &config, |p: &Photo| p.id);
//!
//! album.add(vec![photo], None, MutationOptions::default())?;
//! album.flush().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod config;
pub mod emitter;
pub mod hook;
pub mod queue;
pub mod syncer;
pub mod transport;

pub use collection::{CollectionError, EntityRepository, MutationOptions, SyncedCollection};
pub use config::{ClientConfig, ConfigError, PageConfig, QueueConfig, TransportConfig};
pub use emitter::{EventEmitter, ListenerId};
pub use hook::{SyncHook, VetoFn};
pub use queue::{ChangeQueue, FlushSummary, ItemId, QueueEvent};
pub use syncer::{Settled, Syncer};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, MockTransport, ReqwestTransport, TransportError,
};

pub use changeq_sync_core::{StaticTarget, SyncEvent, SyncOptions, SyncTarget, Veto};
pub use changeq_sync_types::{
    ChangeAction, ChangeBatch, ChangeRecord, Method, StatusText, SyncFailure, SyncSuccess,
    TransactionOutcome, Verb,
};
