mod emails;
mod login;
mod password;
mod profile;
mod register;
mod verify;

pub use login::*;
pub use password::*;
pub use profile::*;
pub use register::*;
pub use verify::*;
