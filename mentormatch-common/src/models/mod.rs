pub mod matching_request;
pub mod user;
