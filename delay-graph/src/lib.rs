pub mod daily;
pub mod delay;
pub mod network;
pub mod reliability;
