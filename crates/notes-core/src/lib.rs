mod backend;
mod note;


pub use backend::Backend;
pub use note::{CreateNoteRequest, Note};
