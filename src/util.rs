pub mod key;
pub mod poll;
