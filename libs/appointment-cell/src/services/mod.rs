pub mod booking;
pub mod lifecycle;
pub mod selection;

pub use booking::{AppointmentGateway, BookingService, BookingStore, SupabaseAppointmentGateway};
pub use lifecycle::BookingLifecycleService;
pub use selection::{contact_action, select_facility};
