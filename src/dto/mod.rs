pub mod auth_dto;
pub mod stone_dto;
