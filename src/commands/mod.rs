pub mod logs;
pub mod view;
pub mod watch;
