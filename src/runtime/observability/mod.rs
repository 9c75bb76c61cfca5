mod factory;
pub mod log;
pub mod noop;
pub mod traits;

pub use self::log::LogObserver;
pub use factory::create_observer;
pub use noop::NoopObserver;
pub use traits::{Observer, ObserverEvent};
