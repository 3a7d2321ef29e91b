pub mod fabric;
pub mod threadings;
pub mod topology;
