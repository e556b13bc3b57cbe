//! RBAC 운영을 위한 도메인 모델.

mod access;
mod menu;
mod menu_guard;
mod menu_tree;
mod role;
mod session;
mod user;

pub use access::*;
pub use menu::*;
pub use menu_guard::*;
pub use menu_tree::*;
pub use role::*;
pub use session::*;
pub use user::*;
