pub mod blocking;
pub mod content;
pub mod health;
pub mod notifications;
pub mod social_graph;
pub mod users;
