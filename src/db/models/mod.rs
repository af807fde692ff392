mod request;
mod reservation;
mod team;
mod window;

pub use request::*;
pub use reservation::*;
pub use team::*;
pub use window::*;
