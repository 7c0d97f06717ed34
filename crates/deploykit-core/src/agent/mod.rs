//! Target agent: the privileged command set run on managed hosts.
//!
//! [`AgentCommand`] is the wire form the controller sends over ssh;
//! [`TargetAgent`] executes it locally on the host.

mod ops;
mod protocol;

pub use ops::TargetAgent;
pub use protocol::{AgentCommand, ServiceAction};
