//! Intake validation: turns an untyped submission payload into an [`OrderDraft`].
//!
//! Free-text fields are truncated to fixed maximums rather than rejected,
//! except the email and file link, where a shortened value would be broken.

use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::{OrderDetailsPatch, OrderFields, RequestType},
};

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_COMPANY_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_NOTES_LEN: usize = 5000;
pub const MAX_MATERIAL_SPEC_LEN: usize = 2000;
pub const MAX_FILE_LINK_LEN: usize = 2000;
pub const MAX_ADDONS: usize = 20;

const MAX_OFFERING_LEN: usize = 100;
const MAX_MATERIAL_LEN: usize = 100;
const MAX_SHORT_LEN: usize = 50;
const MAX_CONTACT_PREF_LEN: usize = 20;
const MAX_PART_ID_LEN: usize = 100;
const MAX_ZIP_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerContact {
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delivery {
    pub method: Option<String>,
    pub zip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EstimateDetails {
    pub offering: Option<String>,
    pub material: Option<String>,
    pub thickness: Option<String>,
    pub custom_thickness: Option<String>,
    pub quantity: Option<String>,
    pub finish: Option<String>,
    pub material_sourcing: Option<String>,
    pub material_spec_details: Option<String>,
    pub addons: Vec<String>,
    pub callback_requested: bool,
    pub preferred_method: Option<String>,
    pub best_time: Option<String>,
    pub needed_by: Option<String>,
    pub delivery: Delivery,
    pub file_link: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReorderDetails {
    pub part_id: String,
    pub revision: Option<String>,
    pub quantity: String,
    pub finish: Option<String>,
    pub needed_by: Option<String>,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestDetails {
    Estimate(EstimateDetails),
    Reorder(ReorderDetails),
}

/// Canonical, bounded form of a submission, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub customer: CustomerContact,
    pub details: RequestDetails,
}

impl OrderDraft {
    pub fn request_type(&self) -> RequestType {
        match self.details {
            RequestDetails::Estimate(_) => RequestType::Estimate,
            RequestDetails::Reorder(_) => RequestType::Reorder,
        }
    }

    pub fn customer_email(&self) -> &str {
        &self.customer.email
    }

    /// Flatten into the column layout of an order row.
    pub fn to_fields(&self) -> OrderFields {
        let mut fields = OrderFields {
            customer_name: self.customer.name.clone(),
            company: self.customer.company.clone(),
            customer_phone: self.customer.phone.clone(),
            ..OrderFields::default()
        };
        match &self.details {
            RequestDetails::Estimate(d) => {
                fields.offering = d.offering.clone();
                fields.material = d.material.clone();
                fields.thickness = d.thickness.clone();
                fields.custom_thickness = d.custom_thickness.clone();
                fields.quantity = d.quantity.clone();
                fields.finish = d.finish.clone();
                fields.material_sourcing = d.material_sourcing.clone();
                fields.material_spec_details = d.material_spec_details.clone();
                fields.addons = d.addons.clone();
                fields.callback_requested = d.callback_requested;
                fields.preferred_method = d.preferred_method.clone();
                fields.best_time = d.best_time.clone();
                fields.needed_by = d.needed_by.clone();
                fields.delivery_method = d.delivery.method.clone();
                fields.delivery_zip = d.delivery.zip.clone();
                fields.file_link = d.file_link.clone();
                fields.notes = d.notes.clone();
            }
            RequestDetails::Reorder(d) => {
                fields.part_id = Some(d.part_id.clone());
                fields.revision = d.revision.clone();
                fields.quantity = Some(d.quantity.clone());
                fields.finish = d.finish.clone();
                fields.needed_by = d.needed_by.clone();
                fields.delivery_method = d.delivery.method.clone();
                fields.delivery_zip = d.delivery.zip.clone();
            }
        }
        fields
    }
}

/// Validate and canonicalize a raw submission. Unknown keys are dropped.
pub fn validate_submission(payload: &Value) -> AppResult<OrderDraft> {
    let input = payload
        .as_object()
        .ok_or_else(|| invalid("Invalid request body"))?;

    let email = match input.get("customer_email") {
        Some(Value::String(s)) if !s.is_empty() => s.trim().to_lowercase(),
        _ => return Err(invalid("Email is required")),
    };
    if email.chars().count() > MAX_EMAIL_LEN || !is_valid_email(&email) {
        return Err(invalid("Invalid email format"));
    }

    let request_type = match input.get("request_type") {
        Some(Value::String(s)) => s.parse::<RequestType>()?,
        _ => return Err(invalid("Invalid request type")),
    };

    let phone = text(input, "customer_phone", MAX_PHONE_LEN);
    if let Some(raw) = input.get("customer_phone").and_then(Value::as_str) {
        if !is_valid_phone(raw) {
            return Err(invalid("Invalid phone format"));
        }
    }

    let customer = CustomerContact {
        email,
        name: text(input, "customer_name", MAX_NAME_LEN),
        company: text(input, "company", MAX_COMPANY_LEN),
        phone,
    };

    let delivery = Delivery {
        method: text(input, "delivery_method", MAX_CONTACT_PREF_LEN),
        zip: text(input, "delivery_zip", MAX_ZIP_LEN),
    };
    if delivery_needs_zip(delivery.method.as_deref()) && delivery.zip.is_none() {
        return Err(invalid("ZIP is required for delivery"));
    }

    let details = match request_type {
        RequestType::Estimate => RequestDetails::Estimate(EstimateDetails {
            offering: text(input, "offering", MAX_OFFERING_LEN),
            material: text(input, "material", MAX_MATERIAL_LEN),
            thickness: text(input, "thickness", MAX_SHORT_LEN),
            custom_thickness: text(input, "custom_thickness", MAX_SHORT_LEN),
            quantity: text(input, "quantity", MAX_SHORT_LEN),
            finish: text(input, "finish", MAX_SHORT_LEN),
            material_sourcing: text(input, "material_sourcing", MAX_SHORT_LEN),
            material_spec_details: text(input, "material_spec_details", MAX_MATERIAL_SPEC_LEN),
            addons: addons(input),
            callback_requested: input
                .get("callback_requested")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            preferred_method: text(input, "preferred_method", MAX_CONTACT_PREF_LEN),
            best_time: text(input, "best_time", MAX_CONTACT_PREF_LEN),
            needed_by: text(input, "needed_by", MAX_CONTACT_PREF_LEN),
            delivery,
            file_link: file_link(input)?,
            notes: text(input, "notes", MAX_NOTES_LEN),
        }),
        RequestType::Reorder => RequestDetails::Reorder(ReorderDetails {
            part_id: text(input, "part_id", MAX_PART_ID_LEN)
                .ok_or_else(|| invalid("Part ID is required"))?,
            revision: text(input, "revision", MAX_SHORT_LEN),
            quantity: text(input, "quantity", MAX_SHORT_LEN)
                .ok_or_else(|| invalid("Quantity is required"))?,
            finish: text(input, "finish", MAX_SHORT_LEN),
            needed_by: text(input, "needed_by", MAX_CONTACT_PREF_LEN),
            delivery,
        }),
    };

    Ok(OrderDraft { customer, details })
}

/// Bound the customer-editable fields with the same rules intake applies.
pub fn sanitize_details_patch(
    quantity: Option<&str>,
    needed_by: Option<&str>,
    notes: Option<&str>,
) -> OrderDetailsPatch {
    OrderDetailsPatch {
        quantity: quantity.and_then(|v| bounded(v, MAX_SHORT_LEN)),
        needed_by: needed_by.and_then(|v| bounded(v, MAX_CONTACT_PREF_LEN)),
        notes: notes.and_then(|v| bounded(v, MAX_NOTES_LEN)),
    }
}

/// Truncate to at most `max` characters. Applying it twice changes nothing.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// `local@domain.tld` shape: one `@`, no whitespace, a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    let chars: Vec<char> = domain.chars().collect();
    chars
        .iter()
        .enumerate()
        .any(|(i, c)| *c == '.' && i > 0 && i + 1 < chars.len())
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | '.' | ' '))
}

fn delivery_needs_zip(method: Option<&str>) -> bool {
    matches!(method, Some("courier") | Some("ship"))
}

fn text(input: &Map<String, Value>, key: &str, max: usize) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .and_then(|v| bounded(v, max))
}

fn bounded(value: &str, max: usize) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(truncate_chars(value, max))
    }
}

fn addons(input: &Map<String, Value>) -> Vec<String> {
    match input.get("addons") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .take(MAX_ADDONS)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn file_link(input: &Map<String, Value>) -> AppResult<Option<String>> {
    match input.get("file_link").and_then(Value::as_str) {
        Some(link) if link.chars().count() > MAX_FILE_LINK_LEN => {
            Err(invalid("File link too long"))
        }
        Some(link) if !link.is_empty() => Ok(Some(link.to_string())),
        _ => Ok(None),
    }
}

fn invalid(message: &str) -> AppError {
    AppError::InvalidInput(message.to_string())
}
