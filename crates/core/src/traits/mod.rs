pub mod collaborators;
pub mod handler;
pub mod repository;
pub mod transport;

pub use collaborators::*;
pub use handler::*;
pub use repository::*;
pub use transport::*;
