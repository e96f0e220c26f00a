mod category_dto;

pub use category_dto::{
    CategoryNodeDto, CategoryResponseDto, CreateCategoryDto, MoveCategoryDto, SearchResultDto,
    UpdateCategoryDto,
};
