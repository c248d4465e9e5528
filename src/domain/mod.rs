mod book_content;
mod category;
mod new_password;
mod new_user;
mod pagination;
mod reset_token;
mod role;
mod user_email;
mod user_name;
mod username;
mod verification_code;

pub use book_content::{BookContent, BookPage};
pub use category::Category;
pub use new_password::NewPassword;
pub use new_user::NewUser;
pub use pagination::Pagination;
pub use reset_token::ResetToken;
pub use role::Role;
pub use user_email::UserEmail;
pub use user_name::UserName;
pub use username::Username;
pub use verification_code::VerificationCode;
