//! 强类型 ID 定义

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
        #[display("{_0}")]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(foodtrace_common::new_id())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// 供应商 ID
    SupplierId
);
define_id!(
    /// 原材料 ID
    RawMaterialId
);
define_id!(
    /// 成品 ID
    ProductId
);
define_id!(
    /// 客户 ID
    CustomerId
);
define_id!(
    /// 生产批次 ID
    BatchId
);
define_id!(
    /// 生产工序 ID
    StageId
);
define_id!(
    /// 批次投料 ID
    ProductionMaterialId
);
define_id!(
    /// X 光检测记录 ID
    XRayCheckId
);
define_id!(
    /// 收货单 ID
    ReceivingFormId
);
define_id!(
    /// 发货单 ID
    ShipmentId
);
define_id!(
    /// 签收单 ID
    DeliveryFormId
);
define_id!(
    /// 发票 ID
    InvoiceId
);
define_id!(
    /// 发票行 ID
    InvoiceItemId
);
define_id!(
    /// 库存流水 ID
    StockMovementId
);
