mod common;
mod end_to_end;
mod properties;
mod server_tests;
