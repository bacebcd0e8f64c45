#![no_std]

pub mod physical;
pub mod registers;
