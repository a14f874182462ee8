pub mod academic;
pub mod assignment;
pub mod attendance;
pub mod department;
pub mod role;
pub mod user;
