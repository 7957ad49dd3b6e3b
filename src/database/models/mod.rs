pub mod appointment;
pub mod professional;
pub mod user;

pub use appointment::{Appointment, AppointmentChanges, AppointmentDetail, NewAppointment};
pub use professional::{NewProfessional, Professional, ProfessionalChanges};
pub use user::{NewUser, User, UserChanges};
