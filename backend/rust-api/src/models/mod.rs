pub mod category;
pub mod email;
pub mod quiz;
pub mod settings;
pub mod snapshot;
pub mod sync;
pub mod user;
