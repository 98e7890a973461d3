//! 库存相关枚举

use super::coded_enum;

coded_enum! {
    /// 库存对象类型
    pub enum StockItemKind {
        RawMaterial = 1 => "raw_material",
        FinishedProduct = 2 => "finished_product",
    }
}

coded_enum! {
    /// 库存变动原因
    pub enum MovementReason {
        /// 收货入库
        Receiving = 1 => "receiving",
        /// 收货冲销
        ReceivingReversal = 2 => "receiving_reversal",
        /// 生产投料
        Consumption = 3 => "consumption",
        /// 投料退回
        ConsumptionReversal = 4 => "consumption_reversal",
        /// 完工入库
        ProductionOutput = 5 => "production_output",
        /// 完工冲销
        ProductionReversal = 6 => "production_reversal",
        /// 发货出库
        Shipment = 7 => "shipment",
        /// 发货退回
        ShipmentReversal = 8 => "shipment_reversal",
        /// 手工调整
        Adjustment = 9 => "adjustment",
    }
}

impl MovementReason {
    /// 该原因适用的库存对象类型，手工调整两者皆可
    pub fn applies_to(&self, kind: StockItemKind) -> bool {
        use MovementReason::*;
        match self {
            Receiving | ReceivingReversal | Consumption | ConsumptionReversal => {
                kind == StockItemKind::RawMaterial
            }
            ProductionOutput | ProductionReversal | Shipment | ShipmentReversal => {
                kind == StockItemKind::FinishedProduct
            }
            Adjustment => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_applies_to_kind() {
        assert!(MovementReason::Receiving.applies_to(StockItemKind::RawMaterial));
        assert!(!MovementReason::Receiving.applies_to(StockItemKind::FinishedProduct));
        assert!(MovementReason::Shipment.applies_to(StockItemKind::FinishedProduct));
        assert!(MovementReason::Adjustment.applies_to(StockItemKind::RawMaterial));
        assert!(MovementReason::Adjustment.applies_to(StockItemKind::FinishedProduct));
    }

    #[test]
    fn test_kind_from_path_segment() {
        assert_eq!(
            "raw_material".parse::<StockItemKind>().unwrap(),
            StockItemKind::RawMaterial
        );
        assert!("widgets".parse::<StockItemKind>().is_err());
    }
}
