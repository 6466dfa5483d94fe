//! Core of the GeoFill profile generator.
//!
//! Generates locale-consistent identity profiles, keeps user-locked fields
//! intact across every bulk update, and talks to the outside world through
//! two seams: [`HttpTransport`] for geolocation, address and model calls,
//! and [`PageBridge`] for the page-side form collaborator.
//! [`ProfileService`] owns the session state; [`dispatch`] maps commands
//! onto it for front ends.

pub mod archive;
pub mod bridge;
pub mod config;
pub mod dispatch;
mod error;
pub mod generator;
pub mod history;
pub mod locale;
mod lock;
pub mod net;
mod reconcile;
pub mod service;
pub mod storage;

pub use archive::{remove_archive, upsert_archive, ArchiveUpsert};
pub use bridge::{send_with_injection, BridgeError, PageBridge, TcpPageBridge};
pub use config::AppConfig;
pub use dispatch::{dispatch, profile_lines, session_event, Outcome, ServiceEvent};
pub use error::GeofillError;
pub use generator::{
    generate_password, is_placeholder_phone, CharClasses, FieldRefresh, ProfileGenerator,
};
pub use history::{format_relative_time, record_history, remove_history};
pub use locale::{load_locales, load_locales_from_env, LocaleCatalog, LocaleRecord, LocalesError};
pub use lock::{LockSet, LockedValues};
pub use net::{HttpResponse, HttpTransport, NetError, ReqwestTransport};
pub use reconcile::{apply_address, reconcile, FieldPolicy};
pub use service::{
    DomainChange, FillOutcome, LocationRefresh, ProfileService, Regenerated, Restored,
    SessionStart,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, Storage, StorageError};

pub use geofill_runtime as runtime;
