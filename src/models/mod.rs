//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod account_model;
pub mod course_model;
pub mod delivery_model;
pub mod money;
pub mod notification_model;
pub mod report_model;
pub mod savings_model;
pub mod transaction_model;
pub mod user_model;
