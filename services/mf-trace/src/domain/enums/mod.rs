//! 领域枚举
//!
//! 数据库中以 SMALLINT 存储，JSON 中以 snake_case 字符串表示

/// 定义带数据库编码的枚举
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = foodtrace_errors::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(foodtrace_errors::AppError::validation(format!(
                        "Unknown {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl TryFrom<i16> for $name {
            type Error = foodtrace_errors::AppError;

            fn try_from(value: i16) -> Result<Self, Self::Error> {
                match value {
                    $($code => Ok($name::$variant),)+
                    other => Err(foodtrace_errors::AppError::internal(format!(
                        "Unknown {} code: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl From<$name> for i16 {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $code,)+
                }
            }
        }
    };
}

pub(crate) use coded_enum;

mod batch_status;
mod invoice_status;
mod logistics;
mod stock;
mod user_role;
mod xray_result;

pub use batch_status::{BatchStatus, StageStatus};
pub use invoice_status::InvoiceStatus;
pub use logistics::{DeliveryCondition, ShipmentStatus};
pub use stock::{MovementReason, StockItemKind};
pub use user_role::UserRole;
pub use xray_result::XRayResult;
