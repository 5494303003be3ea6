//! The relay core: IRC <-> Slack event translation.
//!
//! ## Module Structure
//!
//! - `capabilities`: send traits the loops use to reach each network
//! - `mapping`: static IRC <-> Slack channel table
//! - `membership`: roster snapshots for nick/quit fan-out
//! - `playback`: bouncer replay suppression
//! - `highlight`: owner ping rules
//! - `notices`: Slack text for IRC happenings
//! - `irc_loop` / `slack_loop`: one dispatch loop per direction

pub mod capabilities;
pub mod highlight;
pub mod irc_loop;
pub mod mapping;
pub mod membership;
pub mod notices;
pub mod playback;
pub mod slack_loop;

#[cfg(test)]
pub(crate) mod fakes;

pub use highlight::HighlightMatcher;
pub use irc_loop::IrcRelay;
pub use mapping::ChannelMapping;
pub use slack_loop::SlackRelay;

/// Whether a relay loop keeps consuming after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}
