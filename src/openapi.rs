use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Veda Checkout API",
        description = "Checkout and payment reconciliation flow: session carts, upstream order creation, and payment verification.",
    ),
    paths(
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_line,
        crate::handlers::carts::update_quantity,
        crate::handlers::carts::remove_line,
        crate::handlers::carts::clear_cart,
        crate::handlers::checkout::begin_checkout,
        crate::handlers::checkout::checkout_status,
        crate::handlers::payments::verify_payment,
        crate::handlers::health::health_check,
        crate::handlers::health::api_status,
    ),
    components(schemas(
        crate::services::cart::Cart,
        crate::services::cart::CartLine,
        crate::services::cart::AddLineInput,
        crate::handlers::carts::UpdateQuantityRequest,
        crate::services::intake::Address,
        crate::services::intake::CheckoutRequest,
        crate::services::checkout::CheckoutInitiation,
        crate::services::attempt::Attempt,
        crate::services::attempt::CheckoutPhase,
        crate::services::verify::PaymentConfirmation,
        crate::services::verify::VerificationOutcome,
        crate::errors::ErrorResponse,
    )),
    tags(
        (name = "Carts", description = "Session cart management"),
        (name = "Checkout", description = "Order intake and upstream order creation"),
        (name = "Payments", description = "Payment confirmation verification"),
        (name = "Health", description = "Liveness and status"),
    )
)]
pub struct ApiDoc;
