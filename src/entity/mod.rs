pub mod order_files;
pub mod order_messages;
pub mod orders;
pub mod quotes;

pub use order_files::Entity as OrderFiles;
pub use order_messages::Entity as OrderMessages;
pub use orders::Entity as Orders;
pub use quotes::Entity as Quotes;
