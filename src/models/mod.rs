pub mod exam;
pub mod exam_file;
pub mod exam_keyword;
pub mod invitation;
pub mod user;
