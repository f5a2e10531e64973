pub mod exam_dto;
pub mod invitation_dto;
