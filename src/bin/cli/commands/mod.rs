pub mod cards;
pub mod list;
pub mod reviewed;
pub mod serve;
pub mod study;
pub mod tags;
