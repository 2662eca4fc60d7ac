pub mod recordings;
pub mod system;
