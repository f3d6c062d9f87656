use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth as auth_dto,
        carousels::{CarouselList, CreateCarouselRequest},
        categories::{CategoryList, CreateCategoryRequest},
        orders::{
            CheckoutResponse, CreateOrderRequest, OrderItemRequest, OrderList, OrderWithItems,
            VerifyPaymentRequest, VerifyPaymentResponse,
        },
        products,
    },
    models::{Carousel, Category, CustomerSnapshot, Order, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, carousels, categories, health, orders, params, payment, products as product_routes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::admin_login,
        auth::vendor_register,
        auth::vendor_login,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        carousels::list_carousels,
        carousels::create_carousel,
        carousels::delete_carousel,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        payment::verify_payment,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
    ),
    components(
        schemas(
            User,
            Product,
            Category,
            Carousel,
            CustomerSnapshot,
            Order,
            OrderItem,
            auth_dto::RegisterRequest,
            auth_dto::LoginRequest,
            auth_dto::LoginResponse,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ProductList,
            CreateCategoryRequest,
            CategoryList,
            CreateCarouselRequest,
            CarouselList,
            CreateOrderRequest,
            OrderItemRequest,
            CheckoutResponse,
            OrderList,
            OrderWithItems,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            admin::ProductList,
            admin::UpdateOrderStatusRequest,
            admin::InventoryAdjustRequest,
            admin::LowStockQuery,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<VerifyPaymentResponse>,
            ApiResponse<admin::ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Customer, admin and vendor authentication"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Carousels", description = "Storefront carousel endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Payment", description = "Payment verification endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
