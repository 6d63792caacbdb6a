pub mod account;
pub mod booking;
pub mod employee;
pub mod service;

pub use account::{Account, Role};
pub use booking::{Booking, BookingDetail, BookingEvent, BookingEventKind, BookingLine};
pub use employee::{Employee, EmployeeStatus};
pub use service::{Service, ServiceCategory};
