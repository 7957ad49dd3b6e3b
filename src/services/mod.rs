pub mod account_service;
pub mod appointment_service;
pub mod professional_service;

pub use account_service::AccountService;
pub use appointment_service::AppointmentService;
pub use professional_service::ProfessionalService;
