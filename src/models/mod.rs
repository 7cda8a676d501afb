mod item;
mod user;
mod vote;

pub use item::{Item, NewItem, QueueEntry, Thumbnail, VideoMetadata};
pub use user::User;
pub use vote::{Direction, Tally, VoteOutcome, VoteResult};
