//! Matatu journey planner.
//!
//! A library that answers: "How do I get from here to there on the sacco
//! bus network, walking where it helps?"

pub mod domain;
pub mod fare;
pub mod geometry;
pub mod planner;
pub mod repository;
pub mod walking;
