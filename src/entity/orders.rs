use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_code: String,
    pub request_type: String,
    pub status: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub company: Option<String>,
    pub customer_phone: Option<String>,
    pub offering: Option<String>,
    pub material: Option<String>,
    pub thickness: Option<String>,
    pub custom_thickness: Option<String>,
    pub quantity: Option<String>,
    pub finish: Option<String>,
    pub material_sourcing: Option<String>,
    pub material_spec_details: Option<String>,
    pub addons: Option<Json>,
    pub callback_requested: bool,
    pub preferred_method: Option<String>,
    pub best_time: Option<String>,
    pub part_id: Option<String>,
    pub revision: Option<String>,
    pub needed_by: Option<String>,
    pub delivery_method: Option<String>,
    pub delivery_zip: Option<String>,
    pub file_link: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_files::Entity")]
    OrderFiles,
    #[sea_orm(has_many = "super::quotes::Entity")]
    Quotes,
    #[sea_orm(has_many = "super::order_messages::Entity")]
    OrderMessages,
}

impl Related<super::order_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderFiles.def()
    }
}

impl Related<super::quotes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quotes.def()
    }
}

impl Related<super::order_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderMessages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
