// Services module - external collaborators

pub mod google;

pub use google::{GoogleProfile, GoogleService};
