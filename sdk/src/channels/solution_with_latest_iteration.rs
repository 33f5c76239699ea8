//! Solution with latest iteration channel.

use super::{keyed_identifier, CableChannel, ChannelKind};
use crate::types::SolutionWithLatestIteration;
use crate::ws::Identifier;

/// A solution plus its newest iteration, keyed by solution UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionWithLatestIterationKind;

impl ChannelKind for SolutionWithLatestIterationKind {
    const NAME: &'static str = "SolutionWithLatestIterationChannel";
    type Key = String;
    type Payload = SolutionWithLatestIteration;

    fn identifier(uuid: &String) -> Identifier {
        keyed_identifier(Self::NAME, "uuid", uuid)
    }
}

/// Channel delivering [`SolutionWithLatestIteration`] snapshots.
pub type SolutionWithLatestIterationChannel = CableChannel<SolutionWithLatestIterationKind>;
