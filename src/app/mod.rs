pub mod ports;
pub mod qualify_use_case;
