pub mod balancer;
pub mod clues;
pub mod night;
pub mod scheduler;
pub mod session;
pub mod vote;
pub mod win;
