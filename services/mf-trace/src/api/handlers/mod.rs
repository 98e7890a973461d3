//! 路由处理函数

pub mod billing;
pub mod inventory;
pub mod logistics;
pub mod master_data;
pub mod production;
pub mod quality;
pub mod traceability;
