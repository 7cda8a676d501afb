mod ranker;
mod submission;

pub use ranker::rank;
pub use submission::extract_video_id;
