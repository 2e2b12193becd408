pub mod user;
pub mod social_graph;
pub mod blocking;
pub mod notification;
pub mod content;
