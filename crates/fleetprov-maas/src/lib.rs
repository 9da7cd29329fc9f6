//! MAAS backend for fleetprov
//!
//! Translates backend-agnostic constraints into the arguments of the MAAS
//! "allocate machine" call and seeds a constraint validator with what the
//! region can actually honor.
//!
//! # Requirements
//!
//! - `maas` CLI must be installed
//! - A profile must already be logged in (`maas login <profile> ...`)
//!
//! # Example
//!
//! ```ignore
//! use fleetprov_maas::{AcquireNodeArgs, MaasCli, MaasEnviron};
//! use fleetprov_provider::{ConstraintSet, TokioCommandRunner};
//! use std::sync::Arc;
//!
//! let environ = MaasEnviron::new(MaasCli::new("admin", Arc::new(TokioCommandRunner)));
//!
//! let args = AcquireNodeArgs {
//!     constraints: ConstraintSet::new().with_arch("amd64").with_tags(["ssd"]),
//!     ..Default::default()
//! };
//! let machine = environ.acquire_node(&args).await?;
//! ```

pub mod cli;
pub mod constraints;
pub mod environ;
pub mod error;
pub mod interfaces;
pub mod volumes;

pub use cli::{BootResource, MaasCli, MachineInfo};
pub use constraints::{
    AcquireNodeArgs, ConstraintObserver, TracingObserver, acquire_params, convert_constraints,
    spaces_to_bindings,
};
pub use environ::{MaasEnviron, UNSUPPORTED_CONSTRAINTS};
pub use error::{MaasError, Result};
pub use interfaces::{InterfaceBinding, add_interfaces};
pub use volumes::{VolumeInfo, add_storage};
