use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Carousel;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCarouselRequest {
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CarouselList {
    pub items: Vec<Carousel>,
}
