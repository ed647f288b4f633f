pub mod account;
pub mod appointment;
pub mod connection;
pub mod dose_event;
pub mod enums;
pub mod medication;
pub mod notification;
pub mod vital;

pub use account::*;
pub use appointment::*;
pub use connection::*;
pub use dose_event::*;
pub use enums::*;
pub use medication::*;
pub use notification::*;
pub use vital::*;
