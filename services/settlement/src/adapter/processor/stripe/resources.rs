use serde::{Deserialize, Serialize};

// structured audit payload attached to every capture at the processor,
// closed set of fields, never free-form JSON
#[derive(Serialize)]
pub(super) struct PaymentIntentMetadata {
    pub booking_id: u32,
    pub charge_token: String,
    pub retry: bool,
    pub retry_attempt: u8,
    pub original_charge_token: Option<String>,
}

#[derive(Serialize)]
pub(super) struct CreatePaymentIntent {
    pub amount: i64, // in the smallest currency unit
    pub currency: String,
    pub customer: String,
    pub payment_method: String,
    // capture immediately with the saved instrument, the cardholder is
    // not present at trip-end settlement
    pub confirm: bool,
    pub off_session: bool,
    pub description: String,
    pub metadata: PaymentIntentMetadata,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Debug)]
pub(super) enum PaymentIntentStatus {
    succeeded,
    processing,
    requires_action,
    requires_payment_method,
    requires_confirmation,
    requires_capture,
    canceled,
}

#[derive(Deserialize)]
pub(super) struct LastPaymentError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct PaymentIntent {
    pub id: String,
    pub status: PaymentIntentStatus,
    pub amount: i64,
    pub last_payment_error: Option<LastPaymentError>,
}

// decline responses arrive with HTTP error status and this envelope
// instead of a payment-intent document
#[derive(Deserialize)]
pub(super) struct StripeApiErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
    pub payment_intent: Option<PaymentIntent>,
}
#[derive(Deserialize)]
pub(super) struct StripeApiErrorEnvelope {
    pub error: StripeApiErrorDetail,
}

#[derive(Serialize)]
pub(super) struct CreateRefund {
    pub payment_intent: String,
    pub amount: i64,
    pub reason: String,
}

#[allow(non_camel_case_types)]
#[derive(Deserialize, Debug)]
pub(super) enum RefundStatus {
    succeeded,
    pending,
    failed,
    canceled,
    requires_action,
}

#[derive(Deserialize)]
pub(super) struct RefundResource {
    pub id: String,
    pub status: RefundStatus,
    pub amount: i64,
}

#[derive(Serialize)]
pub(super) struct CreateTransferReversal {
    pub amount: i64,
}

#[derive(Deserialize)]
pub(super) struct TransferReversal {
    pub id: String,
    pub amount: i64,
}
