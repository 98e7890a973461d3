//! 应用层：命令、查询视图与业务处理

pub mod commands;
pub mod handlers;
pub mod queries;
mod stock;

#[cfg(test)]
pub(crate) mod test_support;

pub use handlers::ServiceHandler;
pub use stock::StockChange;
