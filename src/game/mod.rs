pub mod chain;
pub mod lifecycle;
pub mod phonetics;
pub mod pipeline;
pub mod room;
pub mod session;

pub use lifecycle::RoomLifecycle;
pub use pipeline::Pipeline;
