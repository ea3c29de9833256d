pub mod clock;
pub mod note_service;
pub mod projection;

pub use note_service::NoteService;
