pub mod appointment;
pub mod enums;
pub mod filters;
pub mod user;

pub use appointment::{Appointment, NewAppointment, Schedule};
pub use enums::{AppointmentStatus, CancelledBy, RoleKind};
pub use filters::DirectoryFilter;
pub use user::{Actor, NewUser, Role, User};
