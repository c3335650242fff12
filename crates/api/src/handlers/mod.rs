pub mod jobs;
pub mod quotes;
pub mod search;
pub mod users;
