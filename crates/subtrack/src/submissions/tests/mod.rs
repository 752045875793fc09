mod common;
mod resellers;
