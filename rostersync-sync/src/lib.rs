//! # rostersync-sync
//!
//! Reconciliation engine: keeps agent workspaces inside a container in line
//! with the roster file.
//!
//! Call [`Reconciler::run_pass`] (or [`Reconciler::sync_file`]) for one full
//! pass; the daemon repeats it whenever [`fingerprint::step`] reports a change.

pub mod channel;
pub mod docker;
pub mod error;
pub mod fingerprint;
pub mod memory;
pub mod merger;
pub mod pipeline;
pub mod provision;

pub use channel::{CommandOutput, ExecutionChannel, RemoteOp};
pub use docker::DockerChannel;
pub use error::SyncError;
pub use fingerprint::{Fingerprint, PollAction};
pub use memory::MemoryChannel;
pub use merger::{AgentRecord, ModelUpdate, SharedConfig};
pub use pipeline::{run_pass, AgentFailure, PassReport, Poll, Reconciler};
pub use provision::{AgentAction, AgentReport, AttachmentOutcome, Provisioner};
