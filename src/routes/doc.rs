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
        files::{DownloadRequest, SignedUrlResponse, UploadFileRequest, UploadFileResponse},
        orders::{
            OrderDetail, OrderList, PostMessageRequest, SubmitOrderResponse,
            UpdateOrderDetailsRequest, UpdateOrderStatusRequest,
        },
        quotes::{IssueQuoteRequest, QuoteWithOrder},
    },
    models::{Message, Order, OrderFields, OrderFile, OrderStatus, Quote, QuoteStatus, RequestType, SenderType},
    response::{ApiResponse, Meta},
    routes::{admin, files, health, orders, params},
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
        orders::submit_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_details,
        orders::post_message,
        orders::accept_quote,
        files::upload_file,
        files::download_file,
        files::fetch_blob,
        admin::list_all_orders,
        admin::update_order_status,
        admin::issue_quote
    ),
    components(
        schemas(
            Order,
            OrderFields,
            OrderFile,
            OrderStatus,
            Quote,
            QuoteStatus,
            Message,
            RequestType,
            SenderType,
            OrderList,
            OrderDetail,
            SubmitOrderResponse,
            UpdateOrderDetailsRequest,
            UpdateOrderStatusRequest,
            PostMessageRequest,
            IssueQuoteRequest,
            QuoteWithOrder,
            UploadFileRequest,
            UploadFileResponse,
            DownloadRequest,
            SignedUrlResponse,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderDetail>,
            ApiResponse<QuoteWithOrder>,
            ApiResponse<Message>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order intake and status portal"),
        (name = "Files", description = "Order attachments"),
        (name = "Admin", description = "Shop staff endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
