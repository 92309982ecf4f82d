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
        auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        history::{CreateHistoryRequest, CreatedHistoryEntry, PopulateResult},
        notifications::{
            ClearedNotifications, CreateNotificationRequest, CreatedNotification,
            MarkReadRequest, NotificationList, NotificationUpdate, ReadStatus,
        },
        products::{
            AddNoteRequest, CreateProductRequest, DeletedProduct, EditNoteRequest, NoteInput,
            ProductList, ProductStats, UpdateProductByBodyRequest, UpdateProductRequest,
        },
        stats::{BasicStats, DashboardStats, InventoryTrend, RevenueTrend, Trends},
        users::{CreateUserRequest, UpdateUserRequest, UserEnvelope},
    },
    middleware::auth::Session,
    models::{
        ActorSnapshot, HistoryEntry, HistoryType, Notification, NotificationKind, Product,
        ProductNote, User, UserGroup,
    },
    response::{ApiResponse, MessageData, Paginated},
    routes::{
        auth, health, history, inventory, notes, notifications, params, products as product_routes,
        stats, users,
    },
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
        auth::login,
        auth::register,
        inventory::list_inventory,
        inventory::add_product,
        inventory::edit_product,
        inventory::remove_product,
        notes::add_note,
        notes::edit_note,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::update_product_by_body,
        product_routes::delete_product,
        users::list_users,
        users::create_user,
        users::update_user,
        users::delete_user,
        history::list_history,
        history::append_history,
        history::populate_history,
        notifications::list_notifications,
        notifications::get_notification,
        notifications::create_notification,
        notifications::mark_read,
        notifications::update_notification,
        notifications::delete_notification,
        notifications::clear_notifications,
        notifications::mark_all_read,
        notifications::clear_all,
        stats::dashboard_stats
    ),
    components(
        schemas(
            ActorSnapshot,
            ProductNote,
            Product,
            User,
            UserGroup,
            HistoryEntry,
            HistoryType,
            Notification,
            NotificationKind,
            Session,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            NoteInput,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateProductByBodyRequest,
            AddNoteRequest,
            EditNoteRequest,
            ProductStats,
            ProductList,
            DeletedProduct,
            CreateUserRequest,
            UpdateUserRequest,
            UserEnvelope,
            CreateHistoryRequest,
            CreatedHistoryEntry,
            PopulateResult,
            CreateNotificationRequest,
            MarkReadRequest,
            NotificationList,
            ReadStatus,
            NotificationUpdate,
            ClearedNotifications,
            CreatedNotification,
            BasicStats,
            RevenueTrend,
            InventoryTrend,
            Trends,
            DashboardStats,
            MessageData,
            params::SortOrder,
            params::ProductSortField,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Paginated<User>>,
            ApiResponse<Paginated<HistoryEntry>>,
            ApiResponse<NotificationList>,
            ApiResponse<DashboardStats>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Inventory", description = "Inventory for every signed-in user"),
        (name = "Notes", description = "Product notes, open to every signed-in user"),
        (name = "Products", description = "Inventory management"),
        (name = "Users", description = "Account administration"),
        (name = "History", description = "Audit log"),
        (name = "Notifications", description = "Notifications derived from inventory and history"),
        (name = "Stats", description = "Dashboard statistics"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
