pub mod capture;
pub mod init;

pub use capture::{capture, CaptureArgs};
pub use init::{init, InitArgs};
