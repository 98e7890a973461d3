//! mf-trace - 食品生产追溯服务
//!
//! 主数据、库存、生产批次、X 光检测、收发货、开票以及批次/批号追溯

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
