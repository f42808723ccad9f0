pub mod pages;
pub mod wiki;
