use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::carousels::{CarouselList, CreateCarouselRequest},
    entity::carousels::{ActiveModel, Column, Entity as Carousels, Model as CarouselModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Carousel,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_carousels(state: &AppState) -> AppResult<ApiResponse<CarouselList>> {
    let items = Carousels::find()
        .order_by_asc(Column::Position)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(carousel_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Carousels",
        CarouselList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_carousel(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCarouselRequest,
) -> AppResult<ApiResponse<Carousel>> {
    ensure_admin(user)?;

    if payload.title.trim().is_empty() || payload.image_url.trim().is_empty() {
        return Err(AppError::BadRequest("title and image_url are required".into()));
    }

    let carousel = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        image_url: Set(payload.image_url),
        link_url: Set(payload.link_url),
        position: Set(payload.position),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "carousel_created",
        Some("carousels"),
        Some(serde_json::json!({ "carousel_id": carousel.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Carousel created",
        carousel_from_entity(carousel),
        Some(Meta::empty()),
    ))
}

pub async fn delete_carousel(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let result = Carousels::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn carousel_from_entity(model: CarouselModel) -> Carousel {
    Carousel {
        id: model.id,
        title: model.title,
        image_url: model.image_url,
        link_url: model.link_url,
        position: model.position,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
