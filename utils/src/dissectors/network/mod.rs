pub mod ipv4;
