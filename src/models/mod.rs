//! Data models for the VideoTube server.
//!
//! This module contains the stored entities and the data transfer objects
//! (DTOs) handlers exchange with clients.

mod comment;
mod dashboard;
mod like;
mod playlist;
mod response;
mod subscription;
mod tweet;
mod user;
mod video;

pub use comment::*;
pub use dashboard::*;
pub use like::*;
pub use playlist::*;
pub use response::*;
pub use subscription::*;
pub use tweet::*;
pub use user::*;
pub use video::*;
