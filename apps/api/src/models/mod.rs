pub mod insight;
pub mod note;
pub mod person;
