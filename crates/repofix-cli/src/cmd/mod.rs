pub mod ci;
pub mod doctor;
pub mod fix;
pub mod matrix;
pub mod scan;
pub mod smoke;
pub mod stubs;
