//! paramfile-core: named string parameters in a single flat file.
//!
//! - `codec`: plain / compressed / encrypted value codecs and [`Mode`]
//! - `crypto`: passphrase key derivation and XChaCha20-Poly1305 helpers
//! - `store`: [`ParamStore`], the locked get/set/delete engine
//! - `binder`: `key = value` config files bound to a static field table
//! - `log`: logging capability for the binder
//! - `paths`: default file locations
//! - `error`: [`ParamError`]

pub mod binder;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod log;
pub mod paths;
pub mod store;

pub use binder::{process_config, BindConfig, ConfigError, ConfigField, ConfigOutcome, Slot};
pub use codec::Mode;
pub use error::ParamError;
pub use log::{ConfigLog, NoopLog, TracingLog};
pub use store::{check_name, ParamStore, MODE_PARAM_NAME};
