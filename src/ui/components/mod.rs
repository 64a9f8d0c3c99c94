mod choice;
mod input;
mod key_result;
mod pagination;

pub use choice::ChoiceInput;
pub use input::TextInput;
pub use key_result::KeyResult;
pub use pagination::Pagination;
