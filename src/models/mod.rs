pub mod category;
pub mod purchase;
pub mod resource;
pub mod response;
pub mod submission;
pub mod user;
