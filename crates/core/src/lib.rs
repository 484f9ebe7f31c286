pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod fixtures;
pub mod lookup;
pub mod tables;

pub use directory::{PermissionDirectory, StaticPermissionDirectory};
pub use domain::area::Area;
pub use domain::material::{AccountCode, MaterialCode, MaterialRule};
pub use domain::payment::{PaymentRecord, PaymentStatus};
pub use errors::ApplicationError;
pub use lookup::{lookup_material, lookup_payments, MaterialLookup, PaymentLookup};
pub use tables::{InMemoryMaterialCatalog, InMemoryPaymentLedger, MaterialCatalog, PaymentLedger};
