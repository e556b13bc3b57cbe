//! CLI 명령어 구현 모듈.

pub mod check;
pub mod hash_password;
pub mod menu_tree;
pub mod migrate;
pub mod purge_sessions;
pub mod seed;
