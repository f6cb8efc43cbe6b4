pub mod helpers;
pub mod simulate;
