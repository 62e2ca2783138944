pub mod answer;
pub mod candidate;
pub mod history;
pub mod question;
pub mod response;
